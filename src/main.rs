//! A2UI Viewer - renders A2UI surfaces as a text outline

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use a2ui_kit::a2ui::{
    A2uiHost, A2uiMessage, ActionMessage, Element, HostEvent, ManualTransport, RenderState,
    Surface, SurfaceOptions, Transport, TransportConfig, create_transport, message_from_value,
    parse_message,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "a2ui-viewer")]
#[command(version)]
#[command(about = "Render an A2UI surface and print the actions it emits", long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["file", "sse", "ws"])))]
struct Cli {
    /// Read messages from a JSON array or JSON Lines file
    #[arg(long)]
    file: Option<PathBuf>,

    /// Stream messages from an SSE endpoint
    #[arg(long)]
    sse: Option<String>,

    /// Where actions are POSTed (defaults to the SSE URL with /sse replaced by /action)
    #[arg(long, requires = "sse")]
    action_endpoint: Option<String>,

    /// Stream messages over a WebSocket
    #[arg(long)]
    ws: Option<String>,

    /// Surface to render
    #[arg(long, default_value = "main")]
    surface: String,

    /// Feed a value to an input once the surface renders (e.g. name="Ann")
    #[arg(long = "input", value_name = "ID=VALUE", value_parser = parse_input)]
    inputs: Vec<(String, Value)>,

    /// Press a component once the surface renders
    #[arg(long = "click", value_name = "ID")]
    clicks: Vec<String>,

    /// Seconds to keep a network transport open
    #[arg(long, default_value_t = 10)]
    duration: u64,
}

/// `id=value`, where value is JSON when it parses as JSON and a string otherwise.
fn parse_input(raw: &str) -> Result<(String, Value), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got {raw:?}"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((id.to_string(), value))
}

/// Load messages from a file holding a JSON array or one message per line.
fn load_messages(path: &Path) -> Result<Vec<A2uiMessage>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    if content.trim_start().starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(&content)
            .with_context(|| format!("{} is not a JSON array", path.display()))?;
        return Ok(values.into_iter().filter_map(message_from_value).collect());
    }

    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let message = parse_message(line);
            if message.is_none() {
                log::warn!("skipping line that is not an A2UI message: {line}");
            }
            message
        })
        .collect())
}

fn print_surface(surface: &Surface) {
    println!("--- surface {} ---", surface.id());
    match surface.render() {
        Some(tree) => print!("{tree}"),
        None => println!("(nothing to render)"),
    }
}

/// Run `f` on the rendered element with `id`. False when it is not rendered.
fn on_element(surface: &Surface, id: &str, f: impl FnOnce(&Element) -> bool) -> bool {
    let tree = surface.render();
    match tree.as_ref().and_then(|tree| tree.find(id)) {
        Some(element) => f(element),
        None => {
            log::warn!("component {id:?} is not rendered");
            false
        }
    }
}

fn interact(surface: &Surface, cli: &Cli) {
    for (id, value) in &cli.inputs {
        if on_element(surface, id, |element| element.change(value.clone())) {
            log::info!("set {id:?} to {value}");
        } else {
            log::warn!("{id:?} does not take input");
        }
    }
    for id in &cli.clicks {
        if on_element(surface, id, Element::click) {
            log::info!("clicked {id:?}");
        } else {
            log::warn!("{id:?} does not respond to clicks");
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let manual = cli.file.as_ref().map(|_| ManualTransport::new());
    let transport: Box<dyn Transport> = match (&manual, &cli.sse, &cli.ws) {
        (Some(manual), _, _) => Box::new(manual.clone()),
        (None, Some(url), _) => create_transport(&TransportConfig::Sse {
            url: url.clone(),
            action_endpoint: cli.action_endpoint.clone(),
        })?,
        (None, None, Some(url)) => create_transport(&TransportConfig::Websocket { url: url.clone() })?,
        (None, None, None) => create_transport(&TransportConfig::Manual)?,
    };

    let surface = Surface::new(SurfaceOptions::new(cli.surface.clone()));
    surface.set_on_action(|action| {
        match serde_json::to_string(&ActionMessage::new(action.clone())) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("failed to encode action {:?}: {e}", action.name),
        }
    });

    let mut host = A2uiHost::new(transport);
    host.add_surface(surface.clone());
    host.connect()?;

    if let (Some(manual), Some(path)) = (&manual, &cli.file) {
        manual.feed(&load_messages(path)?);
    }

    let deadline = Instant::now() + Duration::from_secs(cli.duration);
    let mut interacted = false;
    loop {
        let events = host.poll();
        if surface.needs_redraw() {
            surface.clear_dirty();
            print_surface(&surface);
        }

        if !interacted && surface.render_state() == RenderState::Populated {
            interacted = true;
            if !cli.inputs.is_empty() || !cli.clicks.is_empty() {
                interact(&surface, &cli);
                if surface.needs_redraw() {
                    surface.clear_dirty();
                    print_surface(&surface);
                }
            }
        }

        let disconnected = events.iter().any(|event| matches!(event, HostEvent::Disconnected));
        if manual.is_some() || disconnected || Instant::now() >= deadline {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    host.disconnect();
    Ok(())
}
