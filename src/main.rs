//! `vodctl`: command-line front end for the VOD client.
//!
//! Loads `AppConfig`, opens the local store and runs one command against the
//! configured sources. Output is pretty JSON on stdout; logs go to stderr.
//! `VOD_METRICS=1` appends the Prometheus counters to stderr on exit.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vod_relay_client::metrics::Metrics;
use vod_relay_client::store::{HistoryEntry, Store};
use vod_relay_client::{
    AppConfig, CompositeFailure, SourceAggregator, DEFAULT_HOME_CATEGORIES,
};

const USAGE: &str = "usage: vodctl <command> [args]

commands:
  sources                 list configured sources (* = active)
  use <key>               switch the active source
  home                    latest updates and category rows
  types                   category table of the active source
  category <id> [page]    one page of a category
  search <keyword>        search the active source
  search-all <keyword>    search every source
  detail <id>             full record
  play <id> [episode]     pick a playback mirror and print the episode URL
  favorite <id>           toggle favorite
  history                 watch history, newest first";

const ENV_LOG_FORMAT: &str = "VOD_LOG_FORMAT";

fn json_logs(format: Option<&str>) -> bool {
    format.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

/// Compact text logs on stderr; `VOD_LOG_FORMAT=json` switches to one JSON
/// object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vod_relay_client=info,warn"));
    let json = json_logs(std::env::var(ENV_LOG_FORMAT).ok().as_deref());

    let (json_layer, text_layer) = if json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(fmt::layer().compact().with_writer(std::io::stderr)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn arg<'a>(args: &'a [String], i: usize, what: &str) -> Result<&'a str> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing <{what}>\n\n{USAGE}"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env in local/dev; VOD_* variables may come from there.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = match Metrics::from_env() {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "metrics disabled");
            None
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = run(&args).await;
    if let Some(m) = &metrics {
        eprintln!("{}", m.render());
    }
    if let Err(e) = result {
        match e.downcast_ref::<CompositeFailure>() {
            Some(failure) => eprintln!("{}", failure.report()),
            None => eprintln!("error: {e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> Result<()> {
    let Some(cmd) = args.first().map(String::as_str) else {
        println!("{USAGE}");
        return Ok(());
    };

    let cfg = AppConfig::load_default().context("loading config")?;
    let mut store = Store::open_default()?;
    let registry = Arc::new(cfg.build_registry()?);
    let client = Arc::new(cfg.build_client()?);
    tracing::debug!(strategies = ?client.strategy_names(), sources = registry.len(), "client ready");

    // Stored setting wins over the config default once the user picked one.
    let active = if registry.contains(&store.settings().source) {
        store.settings().source.clone()
    } else {
        cfg.active_source.clone()
    };
    let agg = SourceAggregator::new(client, registry, &active)
        .ok_or_else(|| anyhow!("no sources configured"))?;

    match cmd {
        "sources" => {
            let current = agg.active_source();
            for s in agg.sources().iter() {
                let mark = if s.key == current.key { "*" } else { " " };
                println!("{mark} {:<10} {}  {}", s.key, s.name, s.url);
            }
        }
        "use" => {
            let key = arg(args, 1, "key")?;
            if !agg.set_source(key) {
                bail!("unknown source '{key}'");
            }
            store.update_settings(|s| s.source = key.to_string())?;
            println!("active source: {}", agg.active_source().name);
        }
        "home" => {
            let latest = agg.get_home_data().await?;
            let sections = agg.get_home_sections(DEFAULT_HOME_CATEGORIES).await;
            print_json(&serde_json::json!({
                "source": agg.active_source().key,
                "latest": latest,
                "sections": sections,
            }))?;
        }
        "types" => print_json(&agg.get_types().await?)?,
        "category" => {
            let type_id: u32 = arg(args, 1, "id")?.parse().context("category id")?;
            let page = match args.get(2) {
                Some(p) => p.parse().context("page")?,
                None => 1,
            };
            print_json(&agg.get_category(type_id, page).await?)?;
        }
        "search" => {
            let kw = args[1..].join(" ");
            let hits = agg.search(&kw).await?;
            store.add_search_history(&kw)?;
            print_json(&hits)?;
        }
        "search-all" => {
            let kw = args[1..].join(" ");
            store.add_search_history(&kw)?;
            print_json(&agg.search_all(&kw).await)?;
        }
        "detail" => {
            let id = arg(args, 1, "id")?;
            match agg.get_detail(&[id]).await? {
                Some(v) => print_json(&v)?,
                None => bail!("no title with id {id}"),
            }
        }
        "play" => {
            let id = arg(args, 1, "id")?;
            let wanted: usize = match args.get(2) {
                Some(n) => n.parse().context("episode number")?,
                None => 1,
            };
            let vod = agg
                .get_detail(&[id])
                .await?
                .ok_or_else(|| anyhow!("no title with id {id}"))?;

            let selector = cfg.selector();
            let episodes = selector.select_episodes(vod.vod_play_url.as_deref());
            if episodes.is_empty() {
                bail!("'{}' has nothing to play", vod.vod_name);
            }
            let index = wanted.clamp(1, episodes.len()) - 1;
            let ep = &episodes[index];

            let previous = store.get_history(&vod.vod_id).cloned().unwrap_or_default();
            store.save_history(
                &vod.vod_id,
                HistoryEntry {
                    episode_url: ep.url.clone(),
                    ep_index: index,
                    title: ep.name.clone(),
                    vod_title: vod.vod_name.clone(),
                    ..previous
                },
            )?;
            print_json(&serde_json::json!({
                "vod_id": vod.vod_id,
                "vod_name": vod.vod_name,
                "episode": ep,
                "episode_count": episodes.len(),
            }))?;
        }
        "favorite" => {
            let id = arg(args, 1, "id")?;
            if store.is_favorite(id) {
                store.remove_favorite(id)?;
                println!("removed {id} from favorites");
            } else {
                let vod = agg
                    .get_detail(&[id])
                    .await?
                    .ok_or_else(|| anyhow!("no title with id {id}"))?;
                store.add_favorite(&vod)?;
                println!("added '{}' to favorites", vod.vod_name);
            }
        }
        "history" => {
            let rows: Vec<_> = store
                .all_history()
                .into_iter()
                .map(|(id, e)| serde_json::json!({ "vod_id": id, "entry": e }))
                .collect();
            print_json(&rows)?;
        }
        "help" | "-h" | "--help" => println!("{USAGE}"),
        other => bail!("unknown command '{other}'\n\n{USAGE}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_switch() {
        assert!(json_logs(Some("json")));
        assert!(json_logs(Some(" JSON ")));
        assert!(!json_logs(Some("compact")));
        assert!(!json_logs(Some("")));
        assert!(!json_logs(None));
    }
}
