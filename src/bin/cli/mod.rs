//! CLI command modules for dbfsplit
//!
//! - `header`: header and field descriptor listing
//! - `plan`: split planning
//! - `scan`: sequential record dump, whole file or one split
//! - `count`: parallel live-record count

use clap::Args;
use dbfsplit::io::dbf::{charset, ScanOptions};
use dbfsplit::split::SplitConfig;
use dbfsplit::{DbfError, Result};

pub mod count;
pub mod header;
pub mod plan;
pub mod scan;

/// Split planning options.
#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    /// Records per split [default: $DBFSPLIT_RECORDS_PER_SPLIT or 100000]
    #[arg(long, value_name = "N")]
    pub records_per_split: Option<u64>,

    /// Chunks that must remain before another full split is cut
    #[arg(long, value_name = "F")]
    pub slop: Option<f64>,
}

impl SplitArgs {
    pub fn config(&self) -> Result<SplitConfig> {
        let mut config = SplitConfig::from_env()?;
        if let Some(records) = self.records_per_split {
            config = config.with_records_per_split(records);
        }
        if let Some(slop) = self.slop {
            config = config.with_slop(slop);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Field decoding options.
#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Charset of character fields (e.g. gbk, big5, windows-1252)
    /// [default: from the header's language driver, else gbk]
    #[arg(long, value_name = "LABEL")]
    pub encoding: Option<String>,

    /// Fail on malformed field values instead of substituting zero/empty
    #[arg(long)]
    pub strict: bool,
}

impl DecodeArgs {
    pub fn options(&self) -> Result<ScanOptions> {
        let mut options = ScanOptions::default().strict(self.strict);
        if let Some(label) = &self.encoding {
            let encoding = charset::from_label(label)
                .ok_or_else(|| DbfError::InvalidConfig(format!("unknown encoding '{}'", label)))?;
            options = options.with_encoding(encoding);
        }
        Ok(options)
    }
}
