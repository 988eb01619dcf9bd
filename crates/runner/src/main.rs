use apiscout_ports::DiscoverySource;
use apiscout_runner::{ScoutConfig, build_reconciler, build_source, log_config};
use log::{error, info};

fn print_help() {
    eprintln!(
        r#"apiscout - catalog and document the APIs of your Kubernetes services

USAGE:
    apiscout [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    SWAGGERSTORE        Where API documents are written (default: /tmp/static/swaggerdocs)
    HUGOSTORE           Where Hugo pages are written (default: /tmp/content/apis)
    MODE                KUBE (in-cluster) or LOCAL (default: LOCAL)
    EXTERNALIP          Reach services on this IP and their node port
    HUGODIR             Hugo site root; regenerated after every change
    KUBE_API_URL        API server URL in LOCAL mode (default: http://127.0.0.1:8001)
    USERNAME            Gateway user; enables gateway publishing
    PASSWORD            Gateway password
    APIKEY              Gateway API key
    APISECRETE          Gateway API secret
    AREAID              Gateway area UUID
    AREADOMAIN          Gateway portal domain
    MASHERY_TEMPLATE    Gateway template file (default: /tmp/masheryTemplate.json)
    HTTP_TIMEOUT_SECS   Outbound HTTP timeout (default: 30)
    RUST_LOG            Log level filter

EXAMPLES:
    # Against a local kubectl proxy
    kubectl proxy --port=8001 &
    apiscout

    # Inside the cluster
    MODE=KUBE HUGODIR=/site apiscout
"#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            ScoutConfig::from_file(&path)?
        }
        None => ScoutConfig::from_env()?,
    };
    log_config(&config);

    let reconciler = build_reconciler(&config)?;
    let mut source = build_source(&config)?;

    if let Err(e) = reconciler.run(&mut source).await {
        error!("{} failed: {}", source.name(), e);
        return Err(e.into());
    }
    Ok(())
}
