//! Elaborates each built-in demo circuit and checks the Verilog it emits
//! against the shape described for it. Port names carry an `io_` prefix
//! (the module's io bundle is itself named `io`) and instance-local wires
//! carry the instance name as their prefix instead.

use hdl_backend::{Backend, EmitConfig, VerilogBackend};
use hdl_ir::Printer;

fn render(demo: &str) -> String {
    let module = hdl::demos::build(demo).unwrap_or_else(|e| panic!("elaborating `{demo}` failed: {e}"));
    let conf = EmitConfig::default();
    let mut out = Vec::new();
    VerilogBackend::emit(&module.borrow(), &conf, &mut out).unwrap_or_else(|e| panic!("emitting `{demo}` failed: {e}"));
    String::from_utf8(out).unwrap()
}

#[test]
fn unknown_demo_name_is_an_error() {
    assert!(hdl::demos::build("nope").is_err());
}

#[test]
fn mux_emits_a_two_way_assign() {
    let verilog = render("mux");
    assert!(verilog.contains("module mux2to1("));
    assert!(verilog.contains("input wire io_sel"));
    assert!(verilog.contains("output wire [7:0] io_out"));
    assert!(verilog.contains("assign io_out ="));
}

#[test]
fn adder_instantiates_full_adder_twice_and_chains_the_carry() {
    let verilog = render("adder");
    // `full_adder` is built through a `ModuleCache`, so its emitted name
    // carries an argument-hash suffix (both instances share one module body).
    assert!(verilog.contains("module full_adder_"));
    assert!(verilog.contains("module ripple_adder2("));
    let fa_lines: Vec<&str> = verilog.lines().filter(|l| l.contains(" fa0 (") || l.contains(" fa1 (")).collect();
    assert_eq!(fa_lines.len(), 2);
    assert!(fa_lines.iter().all(|l| l.trim_start().starts_with("full_adder_")));
    assert!(verilog.contains(".io_cin(fa1_cin)"));
    assert!(verilog.contains("assign fa1_cin = fa0_cout;"));
}

#[test]
fn gcd_declares_two_registers_clocked_on_the_same_edge() {
    let verilog = render("gcd");
    assert!(verilog.contains("module gcd("));
    assert!(verilog.contains("always @(posedge io_clock) begin"));
    assert!(verilog.contains("a_reg <="));
    assert!(verilog.contains("b_reg <="));
    assert!(verilog.contains("assign io_done ="));
}

#[test]
fn enum_fsm_sizes_the_state_register_to_two_bits() {
    let verilog = render("enum");
    assert!(verilog.contains("module enum_fsm("));
    assert!(verilog.contains("output wire [1:0] io_state"));
    assert!(verilog.contains("if (io_reset) begin"));
}

#[test]
fn memory_demo_declares_a_backing_array_and_a_write_guard() {
    let verilog = render("memory");
    assert!(verilog.contains("module memory_demo("));
    assert!(verilog.contains("[0:255];"));
    assert!(verilog.contains("if (io_wen) begin"));
    assert!(verilog.contains("assign io_rdata ="));
}

#[test]
fn dump_ir_reports_ports_and_operators_without_going_through_a_backend() {
    let module = hdl::demos::build("adder").unwrap();
    let dump = Printer::format_module(&module.borrow()).unwrap();
    assert!(dump.contains("module ripple_adder2 {"));
    assert!(dump.contains("io_a: Input<2>"));
    assert!(dump.contains("io_sum: Output<2>"));
    assert!(dump.contains("operators:"));
    assert!(dump.contains("inst fa0: full_adder"));
    assert!(dump.contains("inst fa1: full_adder"));
}

#[test]
fn instance_demo_wires_a_single_passthrough_child() {
    let verilog = render("instance");
    assert!(verilog.contains("module passthrough("));
    assert!(verilog.contains("module instance_demo("));
    assert!(verilog.contains("passthrough child_inst ("));
    assert!(verilog.contains("assign io_y = io_x;"));
    assert!(verilog.contains("assign child_inst_x = io_a;"));
    assert!(verilog.contains("assign io_b = child_inst_y;"));
}
