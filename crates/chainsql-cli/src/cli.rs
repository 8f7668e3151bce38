use std::path::PathBuf;

use chainsql::{DbKey, Limit, StatementKind};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Sql,
    Tables,
    Build,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Sql(SqlArgs),
    Tables(TablesArgs),
    Build(BuildArgs),
}

#[derive(Debug, Clone)]
pub struct SqlArgs {
    pub config: PathBuf,
    pub db: DbKey,
    pub statement: String,
}

#[derive(Debug, Clone)]
pub struct TablesArgs {
    pub config: PathBuf,
    pub db: DbKey,
}

/// Clause values collected from `build` flags.
#[derive(Debug, Clone, Default)]
pub struct Clauses {
    pub distinct: bool,
    pub field: Option<String>,
    pub join: Option<String>,
    pub where_: Option<Value>,
    pub group: Option<String>,
    pub having: Option<Value>,
    pub order: Option<String>,
    pub limit: Option<Limit>,
    pub data: Option<Value>,
    pub columns: Option<Value>,
    pub rows: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct BuildArgs {
    pub kind: StatementKind,
    pub table: String,
    pub count_key: String,
    pub clauses: Clauses,
}

const DEFAULT_CONFIG: &str = "chainsql.toml";

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    match first.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help(HelpTopic::Root)),
        "sql" => parse_sql(it.map(|s| s.as_str())),
        "tables" => parse_tables(it.map(|s| s.as_str())),
        "build" => parse_build(it.map(|s| s.as_str())),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

/// Numeric keys address list entries, anything else a named database.
fn parse_db_key(v: &str) -> DbKey {
    match v.parse::<usize>() {
        Ok(index) => DbKey::Index(index),
        Err(_) => DbKey::Name(v.to_string()),
    }
}

/// Flags shared by the commands that open a database.
struct Target {
    config: PathBuf,
    db: DbKey,
}

impl Target {
    fn new() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG),
            db: DbKey::default(),
        }
    }

    /// Consume `token` if it is a target flag. Returns `Ok(false)` otherwise.
    fn accept<'a>(
        &mut self,
        token: &str,
        it: &mut impl Iterator<Item = &'a str>,
    ) -> anyhow::Result<bool> {
        match token {
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                self.config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                self.config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "--db" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--db requires a value");
                };
                self.db = parse_db_key(v);
            }
            _ if token.starts_with("--db=") => {
                self.db = parse_db_key(token.trim_start_matches("--db="));
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

fn parse_sql<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut target = Target::new();
    let mut words: Vec<&str> = Vec::new();

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Sql)),
            _ if target.accept(token, &mut it)? => {}
            _ if token.starts_with("--") => anyhow::bail!("unknown argument: {token}"),
            _ => words.push(token),
        }
    }

    let statement = words.join(" ");
    if statement.trim().is_empty() {
        anyhow::bail!("missing SQL statement");
    }

    Ok(Command::Sql(SqlArgs {
        config: target.config,
        db: target.db,
        statement,
    }))
}

fn parse_tables<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut target = Target::new();

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Tables)),
            _ if target.accept(token, &mut it)? => {}
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Tables(TablesArgs {
        config: target.config,
        db: target.db,
    }))
}

fn parse_kind(v: &str) -> anyhow::Result<StatementKind> {
    Ok(match v {
        "insert" => StatementKind::Insert,
        "update" => StatementKind::Update,
        "delete" => StatementKind::Delete,
        "select" => StatementKind::Select,
        "count" => StatementKind::Count,
        other => anyhow::bail!("unknown statement kind: {other}"),
    })
}

/// `--where`/`--having` take either a JSON object or raw SQL text.
fn parse_filter(v: &str) -> Value {
    match serde_json::from_str::<Value>(v) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::String(v.to_string()),
    }
}

/// A bare digit string is a row count; anything else (`20,10`) stays text.
fn parse_limit(v: &str) -> Limit {
    let v = v.trim();
    match v.parse::<i64>() {
        Ok(n) if v.bytes().all(|b| b.is_ascii_digit()) => Limit::Rows(n),
        _ => Limit::Text(v.to_string()),
    }
}

fn parse_json(flag: &str, v: &str) -> anyhow::Result<Value> {
    serde_json::from_str(v).map_err(|e| anyhow::anyhow!("{flag} expects JSON: {e}"))
}

fn parse_build<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut kind: Option<StatementKind> = None;
    let mut table: Option<String> = None;
    let mut count_key = chainsql::builder::DEFAULT_COUNT_KEY.to_string();
    let mut clauses = Clauses::default();

    while let Some(token) = it.next() {
        if matches!(token, "-h" | "--help") {
            return Ok(Command::Help(HelpTopic::Build));
        }
        if token == "--distinct" {
            clauses.distinct = true;
            continue;
        }

        let (flag, inline) = match token.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
            _ => (token, None),
        };

        if !flag.starts_with("--") {
            if kind.is_none() {
                kind = Some(parse_kind(token)?);
            } else if table.is_none() {
                table = Some(token.to_string());
            } else {
                anyhow::bail!("unexpected argument: {token}");
            }
            continue;
        }

        let value = match inline {
            Some(v) => v,
            None => match it.next() {
                Some(v) => v,
                None => anyhow::bail!("{flag} requires a value"),
            },
        };

        match flag {
            "--field" => clauses.field = Some(value.to_string()),
            "--join" => clauses.join = Some(value.to_string()),
            "--where" => clauses.where_ = Some(parse_filter(value)),
            "--group" => clauses.group = Some(value.to_string()),
            "--having" => clauses.having = Some(parse_filter(value)),
            "--order" => clauses.order = Some(value.to_string()),
            "--limit" => clauses.limit = Some(parse_limit(value)),
            "--data" => clauses.data = Some(parse_json(flag, value)?),
            "--columns" => clauses.columns = Some(parse_json(flag, value)?),
            "--rows" => clauses.rows = Some(parse_json(flag, value)?),
            "--key" => count_key = value.to_string(),
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    let Some(kind) = kind else {
        anyhow::bail!("missing statement kind (insert, update, delete, select, count)");
    };
    let Some(table) = table else {
        anyhow::bail!("missing table name");
    };
    if clauses.columns.is_some() != clauses.rows.is_some() {
        anyhow::bail!("--columns and --rows must be given together");
    }

    Ok(Command::Build(BuildArgs {
        kind,
        table,
        count_key,
        clauses,
    }))
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
chainsql - run and build chain-style SQL statements

USAGE:
  chainsql <COMMAND> [OPTIONS]

COMMANDS:
  sql           Run a raw statement against a configured database
  tables        List the tables of a configured database
  build         Print the statement a chain of clauses would produce

ENVIRONMENT:
  CHAINSQL_LOG  Log filter (default: warn), e.g. CHAINSQL_LOG=chainsql.sql=debug

Run `chainsql <command> --help` for more."
            );
        }
        HelpTopic::Sql => {
            println!(
                "\
USAGE:
  chainsql sql [OPTIONS] <STATEMENT>...

OPTIONS:
  --config <FILE>       Config file path (default: chainsql.toml)
  --db <KEY>            Database index or name (default: 0)
  -h, --help            Print help

Row-returning statements print the rows as JSON. Other statements print the
affected row count or the generated key."
            );
        }
        HelpTopic::Tables => {
            println!(
                "\
USAGE:
  chainsql tables [OPTIONS]

OPTIONS:
  --config <FILE>       Config file path (default: chainsql.toml)
  --db <KEY>            Database index or name (default: 0)
  -h, --help            Print help"
            );
        }
        HelpTopic::Build => {
            println!(
                "\
USAGE:
  chainsql build <KIND> <TABLE> [OPTIONS]

KIND:
  insert | update | delete | select | count

OPTIONS:
  --distinct            SELECT DISTINCT
  --field <LIST>        Column list, e.g. \"id,user_name\"
  --join <TEXT>         Join clause, used as written
  --where <FILTER>      JSON object of column equalities, or SQL text
  --group <LIST>        GROUP BY columns
  --having <FILTER>     JSON object or SQL text
  --order <TEXT>        ORDER BY text, e.g. \"id desc\"
  --limit <N[,M]>       LIMIT count or offset,count
  --data <JSON>         Row payload for insert/update
  --columns <JSON>      Column list for a multi-row insert (with --rows)
  --rows <JSON>         Value rows for a multi-row insert (with --columns)
  --key <COLUMN>        Column counted by `count` (default: id)
  -h, --help            Print help

No database is opened; the statement is only printed."
            );
        }
    }
}
