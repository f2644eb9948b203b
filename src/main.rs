mod app;
mod cli;
mod filter;
mod input;
mod k8s;
mod model;
mod session;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppCommand};
use clap::Parser;
use cli::CliArgs;
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use k8s::KubeGateway;
use model::{ConfigDump, FetchKey};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use session::SessionStore;
use std::io::{self, Stdout};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval, timeout};
use tracing::debug;
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
const POD_LIST_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug)]
enum FetchEvent {
    Loaded { key: FetchKey, dump: ConfigDump },
    Failed { key: FetchKey, error: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter)?;

    let gateway = KubeGateway::new(args.context.clone()).await?;
    let mut app = App::new(
        gateway.cluster().to_string(),
        gateway.context().to_string(),
        args.namespace.clone(),
        args.workload.clone(),
        SessionStore::discover(),
    );
    app.set_user(gateway.user().to_string());

    run(&mut app, &gateway, &args).await
}

fn init_tracing(level_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::sink)
        .try_init();

    Ok(())
}

async fn run(app: &mut App, gateway: &KubeGateway, args: &CliArgs) -> Result<()> {
    let mut terminal = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, gateway, args).await;
    let restore_result = restore_terminal(&mut terminal);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<TuiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    gateway: &KubeGateway,
    args: &CliArgs,
) -> Result<()> {
    let fetch_timeout = Duration::from_secs(args.fetch_timeout_secs.max(1));
    let (fetch_tx, mut fetch_rx) = mpsc::unbounded_channel::<FetchEvent>();

    let command = refresh_pods(app, gateway).await;
    dispatch(app, gateway, args, command, &fetch_tx, fetch_timeout).await;

    let mut reader = EventStream::new();
    let mut ticker = interval(Duration::from_millis(args.refresh_ms.max(1_000)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            dispatch(app, gateway, args, command, &fetch_tx, fetch_timeout).await;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                let command = refresh_pods(app, gateway).await;
                dispatch(app, gateway, args, command, &fetch_tx, fetch_timeout).await;
            }
            maybe_fetch = fetch_rx.recv() => {
                match maybe_fetch {
                    Some(FetchEvent::Loaded { key, dump }) => app.commit_config(&key, dump),
                    Some(FetchEvent::Failed { key, error }) => app.fetch_failed(&key, error),
                    None => break,
                }
            }
        }
    }

    Ok(())
}

async fn dispatch(
    app: &mut App,
    gateway: &KubeGateway,
    args: &CliArgs,
    command: AppCommand,
    fetch_tx: &mpsc::UnboundedSender<FetchEvent>,
    fetch_timeout: Duration,
) {
    match command {
        AppCommand::None => {}
        AppCommand::RefreshPods => {
            let follow_up = refresh_pods(app, gateway).await;
            if let AppCommand::FetchConfig { key } = follow_up {
                spawn_fetch(gateway, args, key, fetch_tx.clone(), fetch_timeout);
            }
        }
        AppCommand::FetchConfig { key } => {
            spawn_fetch(gateway, args, key, fetch_tx.clone(), fetch_timeout);
        }
    }
}

async fn refresh_pods(app: &mut App, gateway: &KubeGateway) -> AppCommand {
    match timeout(
        POD_LIST_TIMEOUT,
        gateway.fetch_ztunnel_pods(app.namespace(), app.workload()),
    )
    .await
    {
        Ok(Ok(pods)) => app.set_pods(pods),
        Ok(Err(error)) => {
            app.report_error(
                format!(
                    "Could not list {} pods in namespace '{}'.",
                    app.workload(),
                    app.namespace()
                ),
                format!("{error:#}"),
            );
            AppCommand::None
        }
        Err(_) => {
            app.set_status("Pod list refresh timed out (showing cached pods)");
            AppCommand::None
        }
    }
}

fn spawn_fetch(
    gateway: &KubeGateway,
    args: &CliArgs,
    key: FetchKey,
    fetch_tx: mpsc::UnboundedSender<FetchEvent>,
    fetch_timeout: Duration,
) {
    let gateway = gateway.clone();
    let namespace = args.namespace.clone();

    tokio::spawn(async move {
        let outcome = timeout(
            fetch_timeout,
            gateway.fetch_ztunnel_config(&namespace, &key.pod),
        )
        .await;

        let event = match outcome {
            Ok(Ok(dump)) => FetchEvent::Loaded { key, dump },
            Ok(Err(error)) => FetchEvent::Failed {
                key,
                error: format!("{error:#}"),
            },
            Err(_) => FetchEvent::Failed {
                key,
                error: format!("timed out after {}s", fetch_timeout.as_secs()),
            },
        };
        let _ = fetch_tx.send(event);
    });
}
