//! Inspect command - list the image references of a fragment

use crate::cli::args::{InspectArgs, OutputFormat};
use crate::config::Config;
use crate::error::PanelResult;
use crate::fragment::{ContentKey, Fragment, FragmentParser};
use crate::transport::{HttpTransport, Method, Transport};
use crate::ui::{self, TaskSpinner, UiContext};
use console::style;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct InspectReport<'a> {
    key: &'a str,
    blocks: usize,
    images: Vec<ImageRow<'a>>,
}

#[derive(Debug, Serialize)]
struct ImageRow<'a> {
    index: usize,
    offset: usize,
    locator: &'a str,
    source: &'a str,
}

impl<'a> InspectReport<'a> {
    fn new(fragment: &'a Fragment) -> Self {
        Self {
            key: fragment.key().as_str(),
            blocks: fragment.blocks(),
            images: fragment
                .images()
                .iter()
                .map(|image| ImageRow {
                    index: image.index(),
                    offset: image.offset(),
                    locator: image.locator(),
                    source: image.source(),
                })
                .collect(),
        }
    }
}

/// Execute the inspect command
pub async fn execute(args: InspectArgs, config: &Config) -> PanelResult<()> {
    let ctx = UiContext::detect();
    let key = ContentKey::new(args.key);
    let method = args.method.unwrap_or(config.transport.method);
    let transport = HttpTransport::from_config(config);
    let parser = FragmentParser::from_config(&config.parser);

    let fragment = match args.output {
        OutputFormat::Json => parse(&transport, &parser, &key, method).await?,
        OutputFormat::Table => {
            let mut spinner = TaskSpinner::new(&ctx);
            spinner.start(&format!("Fetching {}...", key));
            match parse(&transport, &parser, &key, method).await {
                Ok(fragment) => {
                    spinner.stop(&format!("Parsed {}", key));
                    fragment
                }
                Err(e) => {
                    spinner.stop_error(&format!("Could not inspect {}", key));
                    return Err(e);
                }
            }
        }
    };

    let report = InspectReport::new(&fragment);
    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_table(&ctx, &report),
    }

    Ok(())
}

async fn parse(
    transport: &HttpTransport,
    parser: &FragmentParser,
    key: &ContentKey,
    method: Method,
) -> PanelResult<Fragment> {
    let markup = transport.fetch(key.as_str(), method).await?;
    parser.parse(key, &markup)
}

fn print_table(ctx: &UiContext, report: &InspectReport<'_>) {
    ui::key_value(ctx, "blocks", &report.blocks.to_string());
    ui::key_value(ctx, "images", &report.images.len().to_string());

    if report.images.is_empty() {
        ui::remark(ctx, "No image references");
        return;
    }

    println!();
    println!(
        "{:<6} {:<8} {}",
        style("INDEX").bold(),
        style("OFFSET").bold(),
        style("SOURCE").bold()
    );
    for image in &report.images {
        println!("{:<6} {:<8} {}", image.index, image.offset, image.source);
    }
}
