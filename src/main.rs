mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{
    AnalyticsCommands, BudgetCommands, ClassifyCommands, Cli, Commands, PatternsCommands,
    ProfileCommands, RulesCommands, TransactionsCommands,
};
use costwise::settings::load_settings;

fn init_logging(level: Option<&str>) {
    let fallback = level.map(str::to_string).unwrap_or_else(|| load_settings().log_level);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Profile { command } => match command {
            ProfileCommands::Set {
                category,
                business_model,
                core_activities,
                revenue_streams,
                cost_centers,
                size_scale,
                revenue_range,
            } => cli::profile::set(costwise::models::BusinessProfile {
                category,
                business_model,
                core_activities,
                revenue_streams,
                cost_centers,
                size_scale,
                revenue_range,
            }),
            ProfileCommands::Show => cli::profile::show(),
        },
        Commands::Transactions { command } => match command {
            TransactionsCommands::Add {
                date,
                description,
                amount,
                category,
                txn_type,
            } => cli::transactions::add(&date, &description, amount, &category, &txn_type),
            TransactionsCommands::List {
                month,
                from_date,
                to_date,
            } => cli::transactions::list(month.as_deref(), from_date.as_deref(), to_date.as_deref()),
        },
        Commands::Classify { command } => match command {
            ClassifyCommands::Run { all } => cli::classify::run(all),
            ClassifyCommands::Set {
                id,
                cost_type,
                cost_nature,
            } => cli::classify::set(id, &cost_type, &cost_nature),
            ClassifyCommands::Clear { id } => cli::classify::clear(id),
        },
        Commands::Rules { command } => match command {
            RulesCommands::Add {
                keyword,
                cost_type,
                cost_nature,
                category,
                match_type,
                confidence,
            } => cli::rules::add(&keyword, &cost_type, &cost_nature, category.as_deref(), &match_type, confidence),
            RulesCommands::List { category } => cli::rules::list(category.as_deref()),
            RulesCommands::Delete { id } => cli::rules::delete(id),
        },
        Commands::Patterns { command } => match command {
            PatternsCommands::List { category } => cli::patterns::list(category.as_deref()),
        },
        Commands::Analytics { command } => match command {
            AnalyticsCommands::Summary {
                month,
                from_date,
                to_date,
                json,
            } => cli::analytics::summary(month.as_deref(), from_date.as_deref(), to_date.as_deref(), json),
            AnalyticsCommands::Trend {
                from_date,
                to_date,
                granularity,
                periods,
            } => cli::analytics::trend(from_date.as_deref(), to_date.as_deref(), &granularity, periods),
            AnalyticsCommands::Generate {
                month,
                from_date,
                to_date,
                regenerate,
            } => cli::analytics::generate(month.as_deref(), from_date.as_deref(), to_date.as_deref(), regenerate),
        },
        Commands::Budget { command } => match command {
            BudgetCommands::Add {
                name,
                category,
                amount,
                from_date,
                to_date,
                period,
            } => cli::budget::add(&name, &category, amount, &from_date, &to_date, &period),
            BudgetCommands::List => cli::budget::list(),
            BudgetCommands::Variance { period, date } => cli::budget::variance(&period, date.as_deref()),
            BudgetCommands::Refresh => cli::budget::refresh(),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
