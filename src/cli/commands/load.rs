//! Load command - bind a key to a target and load it

use crate::binding::{BindingOptions, DisplayBinding, FileTarget, MountTarget, StdoutTarget};
use crate::cache::FragmentCache;
use crate::cli::args::LoadArgs;
use crate::config::Config;
use crate::error::PanelResult;
use crate::fragment::{ContentKey, Fragment, FragmentParser};
use crate::inline::{ImageInliner, TransportImageLoader};
use crate::resolver::FragmentResolver;
use crate::transport::{HttpTransport, Transport};
use crate::ui::{self, ResolveBar, UiContext};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Execute the load command
pub async fn execute(args: LoadArgs, config: &Config) -> PanelResult<()> {
    let ctx = UiContext::detect();
    let key = ContentKey::new(args.key);
    let method = args.method.unwrap_or(config.transport.method);

    let mut images = config.images.clone();
    if let Some(format) = args.format {
        images.format = format;
    }

    // Mounted markup owns stdout unless it goes to a file
    let report = args.target.is_some();
    let target: Arc<dyn MountTarget> = match args.target {
        Some(path) => Arc::new(FileTarget::new(path)),
        None => Arc::new(StdoutTarget),
    };

    let bar_ctx = if report {
        ctx.clone()
    } else {
        UiContext::non_interactive()
    };
    let bar = Arc::new(ResolveBar::new(&bar_ctx, key.as_str()));
    let sink = Arc::clone(&bar);

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(config));
    let loader = Arc::new(TransportImageLoader::new(Arc::clone(&transport)));
    let inliner = Arc::new(ImageInliner::from_config(loader, &images));
    let resolver = FragmentResolver::from_config(inliner, &images)
        .with_progress(move |progress| sink.update(progress.completed, progress.total));
    let cache = FragmentCache::new(transport, FragmentParser::from_config(&config.parser), resolver)
        .with_method(method);

    let options = BindingOptions::from_config(config).method(method).auto(false);
    let mut binding = DisplayBinding::new(cache.clone(), key.clone(), target, options);

    if report {
        ui::intro(&ctx, &format!("Loading {}", key));
    }

    let mut fragment = None;
    for round in 1..=args.repeat {
        let started = Instant::now();
        let outcome = if round == 1 {
            binding.load().await
        } else {
            binding.reload().await
        };
        bar.finish();
        let loaded = outcome?;

        let elapsed = started.elapsed();
        debug!("Load {} of {} took {:?}", round, key, elapsed);
        if report {
            ui::step_ok_detail(
                &ctx,
                &format!("Load {}", round),
                &format!("{} ms", elapsed.as_millis()),
            );
        }
        fragment = Some(loaded);
    }

    if let (true, Some(fragment)) = (report, fragment) {
        print_summary(&ctx, binding.key(), &fragment, &cache, args.repeat);
    }

    Ok(())
}

fn print_summary(
    ctx: &UiContext,
    key: &ContentKey,
    fragment: &Fragment,
    cache: &FragmentCache,
    loads: u32,
) {
    ui::section(ctx, key.as_str());
    ui::key_value(ctx, "images", &fragment.image_count().to_string());
    ui::key_value(ctx, "blocks", &fragment.blocks().to_string());
    ui::key_value(ctx, "digest", &fragment.digest());
    if let Some(resolved_at) = fragment.resolved_at() {
        ui::key_value(
            ctx,
            "resolved",
            &resolved_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
    }
    ui::outro_success(
        ctx,
        &format!("{} load(s), {} fetch(es)", loads, cache.fetch_count()),
    );
}
