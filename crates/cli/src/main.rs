mod args;
mod render;
mod url_file;

use std::collections::HashMap;

use anyhow::Context;
use clap::Parser;
use engine::preprocess::{StandardUrlPreprocessor, UrlPreprocessor};
use engine::{Config, Message, MessageKind};
use tracing_subscriber::EnvFilter;

use args::Args;
use render::Renderer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut urls = args.urls.clone();
    if let Some(path) = &args.file {
        let from_file = url_file::load_url_file(path)
            .with_context(|| format!("failed to read URL file {}", path.display()))?;
        urls.extend(from_file);
    }

    let headers: HashMap<String, String> = args.parsed_headers().into_iter().collect();

    let config = Config {
        max_conn_file: args.max_conn_file,
        max_conn: args.max_conn,
        output_directory: args.output.clone(),
        insecure: args.insecure,
        overwrite: args.overwrite,
        proxy: args.proxy.clone(),
        buffer_size: args.buffer_size_kib * 1024,
        no_resume: args.no_resume,
        headers,
    };

    let mut preprocessors: Vec<Box<dyn UrlPreprocessor>> = vec![Box::new(StandardUrlPreprocessor::new())];
    if let (Some(username), Some(password)) = (&args.alldebrid_username, &args.alldebrid_password) {
        preprocessors.push(Box::new(api::AllDebridPreprocessor::new(
            username.clone(),
            password.clone(),
        )));
    }

    let handle = engine::run(config, urls, preprocessors)
        .await
        .context("failed to start download run")?;

    let (mut snapshots, mut messages, mut join) = handle.into_parts();
    let mut renderer = (!args.quiet).then(|| Renderer::new(args.scroll));

    let summary = loop {
        tokio::select! {
            biased;
            result = &mut join => {
                while let Ok(msg) = messages.try_recv() {
                    log_message(&msg);
                }
                break result.unwrap_or(engine::Summary {
                    total_bytes: 0,
                    elapsed: std::time::Duration::default(),
                });
            }
            changed = snapshots.changed() => {
                if changed.is_ok() {
                    if let Some(renderer) = renderer.as_mut() {
                        renderer.render(&snapshots.borrow());
                    }
                }
            }
            msg = messages.recv() => {
                if let Ok(msg) = msg {
                    log_message(&msg);
                }
            }
        }
    };

    if let Some(renderer) = renderer.as_ref() {
        renderer.finish(&summary);
    }

    Ok(())
}

fn log_message(msg: &Message) {
    match msg.kind {
        MessageKind::Info => tracing::info!(context = %msg.context, file_id = msg.file_id, "{}", msg.content),
        MessageKind::Warning => tracing::warn!(context = %msg.context, file_id = msg.file_id, "{}", msg.content),
        MessageKind::Error => tracing::error!(context = %msg.context, file_id = msg.file_id, "{}", msg.content),
    }
}
