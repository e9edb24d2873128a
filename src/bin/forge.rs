use clap::Parser;
use colored::Colorize;
use fingerprint_forge::config::Config;
use fingerprint_forge::network::Network;
use fingerprint_forge::pipeline::FingerprintRequest;
use fingerprint_forge::pipeline::HeaderRequest;
use fingerprint_forge::pipeline::Pipeline;

#[derive(Parser)]
#[command(author, version, about = "Sample a synthetic browser fingerprint or header set", long_about = None)]
struct Cli {
    /// Directory holding input.json and value.json, overriding FINGERPRINT_FORGE_MODEL_DIR.
    #[arg(long)]
    model_dir: Option<String>,

    /// Browser names to draw from, e.g. --browser chrome --browser firefox.
    #[arg(long = "browser")]
    browsers: Vec<String>,

    /// Accept-Language locales, in preference order.
    #[arg(long = "locale")]
    locales: Vec<String>,

    /// Fail instead of relaxing constraints when no sample is consistent.
    #[arg(long)]
    strict: bool,

    /// Emit a full fingerprint (screen, navigator, etc.) instead of only headers.
    #[arg(long)]
    fingerprint: bool,
}

fn main() {
    fingerprint_forge::init();

    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.model_dir.as_deref());

    let input = Network::load_path(config.input_model_path())?;
    let value = Network::load_path(config.value_model_path())?;
    let pipeline = Pipeline::new(input, value);

    let mut rng = rand::rng();
    let header_request = HeaderRequest {
        browsers: cli.browsers.into_iter().map(fingerprint_forge::pipeline::BrowserSpec::named).collect(),
        locales: cli.locales,
        strict: cli.strict,
        ..HeaderRequest::default()
    };

    let output = if cli.fingerprint {
        let request = FingerprintRequest { headers: header_request, screen: None };
        let (sample, headers) = pipeline.generate_fingerprint(&request, &mut rng)?;
        serde_json::json!({ "fingerprint": sample, "headers": headers.into_iter().collect::<std::collections::HashMap<_, _>>() })
    } else {
        let headers = pipeline.generate_headers(&header_request, &mut rng)?;
        serde_json::json!(headers.into_iter().collect::<std::collections::HashMap<_, _>>())
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
