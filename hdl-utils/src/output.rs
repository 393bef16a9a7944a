use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

/// Where a backend writes its emitted text. `-`/`<out>` and `<null>` are
/// recognized specially so the CLI's `-o` flag can redirect to stdout or
/// discard output without a real path.
#[derive(Debug, Clone)]
pub enum OutputFile {
    Stdout,
    Null,
    File(PathBuf),
}

impl OutputFile {
    pub fn as_path_string(&self) -> String {
        match self {
            OutputFile::Stdout => "-".to_string(),
            OutputFile::Null => "<null>".to_string(),
            OutputFile::File(path) => path.to_string_lossy().to_string(),
        }
    }

    pub fn get_write(&self) -> crate::Result<Box<dyn Write>> {
        match self {
            OutputFile::Stdout => Ok(Box::new(BufWriter::new(io::stdout()))),
            OutputFile::Null => Ok(Box::new(io::sink())),
            OutputFile::File(path) => std::fs::File::create(path)
                .map(|f| Box::new(BufWriter::new(f)) as Box<dyn Write>)
                .map_err(|e| crate::Error::write_error(format!("{}: {e}", path.display()))),
        }
    }
}

impl FromStr for OutputFile {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "-" | "<out>" => OutputFile::Stdout,
            "<null>" => OutputFile::Null,
            other => OutputFile::File(PathBuf::from(other)),
        })
    }
}
