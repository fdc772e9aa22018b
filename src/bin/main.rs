use clap::Parser;
use research_report_orchestrator::{
    agent::Orchestrator,
    config::AppConfig,
    models::{ReportRequest, RouteKind},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "orchestrator")]
#[command(about = "Generate a markdown research report for a query", long_about = None)]
#[command(version)]
struct Cli {
    /// Route to use instead of classifying the query
    /// (web_research, retrieval_summary, procurement_listing or an alias)
    #[arg(short, long)]
    route: Option<String>,

    /// Extra text appended to the report file name
    #[arg(short = 'n', long)]
    filename_hint: Option<String>,

    /// Query text; several words are joined with spaces
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
}

impl Cli {
    fn into_request(self) -> ReportRequest {
        let mut request = ReportRequest::new(self.query.join(" "));
        request.route = self.route.map(RouteKind::from);
        request.filename_hint = self.filename_hint;
        request
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    info!("Research Report Orchestrator starting");

    let orchestrator = Orchestrator::from_config(&config)?;

    match orchestrator.handle(cli.into_request()).await {
        Ok(outcome) => {
            info!(path = %outcome.saved_path.display(), "Report generated");
            println!("{}", outcome.markdown);
            Ok(())
        }
        Err(e) => {
            eprintln!("Report failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_flag_after_query() {
        let cli = Cli::try_parse_from(["orchestrator", "AAPL", "주가", "--route", "rag"]).unwrap();
        let request = cli.into_request();

        assert_eq!(request.query, "AAPL 주가");
        assert_eq!(request.route, Some(RouteKind::RetrievalSummary));
        assert!(request.filename_hint.is_none());
    }

    #[test]
    fn test_short_flags() {
        let cli =
            Cli::try_parse_from(["orchestrator", "-r", "weather", "-n", "memo", "오늘 날씨"])
                .unwrap();
        let request = cli.into_request();

        assert_eq!(request.route, Some(RouteKind::Unrecognized("weather".into())));
        assert_eq!(request.filename_hint.as_deref(), Some("memo"));
        assert_eq!(request.query, "오늘 날씨");
    }

    #[test]
    fn test_classifies_when_route_is_absent() {
        let request = Cli::try_parse_from(["orchestrator", "AI 바우처 공고"])
            .unwrap()
            .into_request();
        assert!(request.route.is_none());
    }

    #[test]
    fn test_rejects_bad_invocations() {
        assert!(Cli::try_parse_from(["orchestrator"]).is_err());
        assert!(Cli::try_parse_from(["orchestrator", "--route", "rag"]).is_err());
        assert!(Cli::try_parse_from(["orchestrator", "--bogus", "q"]).is_err());
    }
}
