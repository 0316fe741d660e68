use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use plaza_client::{
    Client, Filterable, GatewayConfig, Payload, QueryBuilder, RecordingTransport, Row,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "plaza", about = "Run queries through the data gateway function")]
struct Cli {
    /// YAML gateway config; falls back to PLAZA_GATEWAY_* env vars.
    #[arg(long, global = true)]
    config: Option<String>,
    /// Print the outbound request instead of sending it.
    #[arg(long, global = true)]
    dry_run: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Select {
        #[command(flatten)]
        target: Target,
        #[arg(long, default_value = "*")]
        columns: String,
        /// `column` or `column:desc`; repeatable.
        #[arg(long)]
        order: Vec<String>,
        #[arg(long)]
        limit: Option<u64>,
        /// Inclusive `from:to` window.
        #[arg(long)]
        range: Option<String>,
        /// Return at most the first row.
        #[arg(long)]
        single: bool,
    },
    Insert {
        #[arg(long)]
        table: String,
        /// JSON object or array of objects.
        #[arg(long)]
        data: String,
    },
    Update {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        data: String,
    },
    Delete {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Args)]
struct Target {
    #[arg(long)]
    table: String,
    /// `column=value`; repeatable. The value is read as JSON first, so
    /// `id=123` sends a number; quote it (`id="123"`) to send a string.
    #[arg(long)]
    eq: Vec<String>,
    /// `column.op=value` with op one of neq, gt, gte, lt, lte, like, ilike, in, is.
    #[arg(long)]
    filter: Vec<String>,
    /// Column that must not be null; repeatable.
    #[arg(long)]
    not_null: Vec<String>,
    /// Raw disjunction in the gateway's syntax.
    #[arg(long)]
    or: Option<String>,
}

/// JSON literal if it parses as one, otherwise the raw text as a string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn split_pair<'a>(raw: &'a str, sep: char, what: &str) -> anyhow::Result<(&'a str, &'a str)> {
    raw.split_once(sep)
        .ok_or_else(|| anyhow!("{what} `{raw}` is missing `{sep}`"))
}

fn apply_filter<F: Filterable>(q: F, raw: &str) -> anyhow::Result<F> {
    let (lhs, rhs) = split_pair(raw, '=', "filter")?;
    let (column, op) = lhs
        .rsplit_once('.')
        .ok_or_else(|| anyhow!("filter `{raw}` needs `column.op=value`"))?;
    let value = parse_value(rhs);
    Ok(match op {
        "eq" => q.eq(column, value),
        "neq" => q.neq(column, value),
        "gt" => q.gt(column, value),
        "gte" => q.gte(column, value),
        "lt" => q.lt(column, value),
        "lte" => q.lte(column, value),
        "like" => q.like(column, pattern(rhs, value)),
        "ilike" => q.ilike(column, pattern(rhs, value)),
        "in" => match value {
            Value::Array(items) => q.in_(column, items),
            other => q.in_(column, [other]),
        },
        "is" => q.is(column, value),
        other => bail!("unsupported operator `{other}`"),
    })
}

/// Patterns are text: a quoted JSON string is unwrapped, anything else is
/// taken verbatim.
fn pattern(raw: &str, value: Value) -> String {
    match value {
        Value::String(s) => s,
        _ => raw.to_string(),
    }
}

impl Target {
    fn apply<F: Filterable>(&self, mut q: F) -> anyhow::Result<F> {
        for raw in &self.eq {
            let (column, value) = split_pair(raw, '=', "--eq")?;
            q = q.eq(column, parse_value(value));
        }
        for raw in &self.filter {
            q = apply_filter(q, raw)?;
        }
        for column in &self.not_null {
            q = q.is_not_null(column.as_str());
        }
        if let Some(expr) = &self.or {
            q = q.or(expr.as_str());
        }
        Ok(q)
    }

    fn builder(&self, client: &Client) -> anyhow::Result<QueryBuilder> {
        Ok(client.table_named(&self.table)?)
    }
}

fn parse_payload(raw: &str) -> anyhow::Result<Payload> {
    let value: Value = serde_json::from_str(raw).context("--data is not valid JSON")?;
    Ok(Payload::from_value(value)?)
}

fn parse_range(raw: &str) -> anyhow::Result<(u64, u64)> {
    let (from, to) = split_pair(raw, ':', "--range")?;
    Ok((from.parse()?, to.parse()?))
}

async fn run(client: &Client, command: Command) -> anyhow::Result<Vec<Row>> {
    let rows = match command {
        Command::Select {
            target,
            columns,
            order,
            limit,
            range,
            single,
        } => {
            let mut q = target.apply(target.builder(client)?)?;
            for entry in &order {
                q = match entry.split_once(':') {
                    Some((column, "desc")) => q.order(column, false),
                    Some((column, "asc")) => q.order(column, true),
                    Some((_, dir)) => bail!("unknown order direction `{dir}`"),
                    None => q.order(entry.as_str(), true),
                };
            }
            if let Some(n) = limit {
                q = q.limit(n);
            }
            if let Some(raw) = range {
                let (from, to) = parse_range(&raw)?;
                q = q.range(from, to);
            }
            if single {
                q.single().await?.into_iter().collect()
            } else {
                q.select(&columns).await?
            }
        }
        Command::Insert { table, data } => {
            let payload = parse_payload(&data)?;
            client.table_named(&table)?.insert(payload).await?
        }
        Command::Update { target, data } => {
            let payload = parse_payload(&data)?;
            let q = target.builder(client)?.update(payload);
            target.apply(q)?.await?
        }
        Command::Delete { target } => {
            let q = target.builder(client)?.delete();
            target.apply(q)?.await?
        }
    };
    Ok(rows)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.dry_run {
        let recorder = Arc::new(RecordingTransport::new());
        let client = Client::new(recorder.clone());
        run(&client, cli.command).await?;
        for body in recorder.request_bodies().await {
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => GatewayConfig::from_path(path)?,
        None => GatewayConfig::from_env()?,
    };
    let client = Client::from_config(&config)?;
    let rows = run(&client, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
