//! Inline command - print one image as a data URL

use crate::cli::args::InlineArgs;
use crate::config::Config;
use crate::error::PanelResult;
use crate::inline::{ImageInliner, Inliner, TransportImageLoader};
use crate::transport::HttpTransport;
use std::sync::Arc;

/// Execute the inline command
pub async fn execute(args: InlineArgs, config: &Config) -> PanelResult<()> {
    let transport = Arc::new(HttpTransport::from_config(config));
    let loader = Arc::new(TransportImageLoader::new(transport));
    let mut inliner = ImageInliner::from_config(loader, &config.images);
    if let Some(format) = args.format {
        inliner = inliner.with_format(format);
    }

    let data = inliner.inline(&args.locator).await?;
    println!("{}", data);
    Ok(())
}
