use clap::Args;
use getsmart_core::{GetSmartError, InterceptorConfig};
use std::path::PathBuf;

/// Interceptor settings shared by every command.
///
/// Flags override values from `--config`; anything left unset falls back to
/// the config defaults (`GETSMART_ENV=production` for the mode switches).
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Source directory
    #[arg(long, value_name = "DIR")]
    pub src: Option<PathBuf>,

    /// Destination directory; enables writing built scripts to disk
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Trust cached scripts without checking the source tree again
    #[arg(long, conflicts_with = "development")]
    pub production: bool,

    /// Revalidate cached scripts on every request
    #[arg(long)]
    pub development: bool,

    /// Minify built scripts
    #[arg(long, conflicts_with = "no_compress")]
    pub compress: bool,

    /// Serve built scripts unminified
    #[arg(long)]
    pub no_compress: bool,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<InterceptorConfig, GetSmartError> {
        let mut config = match (&self.config, &self.src) {
            (Some(path), _) => InterceptorConfig::from_file(path)?,
            (None, Some(src)) => InterceptorConfig::new(src),
            (None, None) => {
                return Err(GetSmartError::Config(
                    "either --src or --config is required".to_string(),
                ));
            }
        };

        if let Some(src) = &self.src {
            config.src = src.clone();
        }
        if let Some(dest) = &self.dest {
            config.dest = Some(dest.clone());
        }
        if self.production {
            config.is_production = true;
        } else if self.development {
            config.is_production = false;
        }
        if self.compress {
            config.compress = true;
        } else if self.no_compress {
            config.compress = false;
        }

        config.validate()?;
        Ok(config)
    }
}
