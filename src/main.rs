use tracing_subscriber::EnvFilter;

fn main() {
    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(Some(opts)) => opts,
        Ok(None) => return,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    init_logging();

    if let Err(err) = event_feed::run(opts) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("event_feed=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_args(
    mut args: impl Iterator<Item = String>,
) -> Result<Option<event_feed::app::RunOptions>, String> {
    let mut opts = event_feed::app::RunOptions::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Event Feed {}", event_feed::VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                println!(
                    "Event Feed - Browse a social event feed from the terminal.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n  --offline            Use built-in sample events instead of the API\n  --viewer <id>        Remember <id> as the current viewer before loading"
                );
                return Ok(None);
            }
            "--offline" => opts.offline = true,
            "--viewer" => {
                let id = args
                    .next()
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| "--viewer requires an id".to_string())?;
                opts.viewer = Some(id);
            }
            other => return Err(format!("unknown argument {other:?}")),
        }
    }
    Ok(Some(opts))
}
