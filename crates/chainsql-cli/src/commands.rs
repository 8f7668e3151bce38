use anyhow::Context;
use chainsql::{ChainDb, OptionStore, Registry, RegistryConfig, SqlOutcome, builder};
use std::path::Path;

use crate::cli::{BuildArgs, Clauses, SqlArgs, TablesArgs};

fn open_registry(config: &Path) -> anyhow::Result<Registry> {
    let config = RegistryConfig::load(config)
        .with_context(|| format!("failed to load config {}", config.display()))?;
    let mut registry = Registry::with_default_connector();
    registry.build(config)?;
    Ok(registry)
}

fn run_statement(db: &mut ChainDb, statement: &str) -> anyhow::Result<String> {
    Ok(match db.sql(statement)? {
        SqlOutcome::Rows(rows) => serde_json::to_string_pretty(&rows)?,
        SqlOutcome::Mutated(result) => result.to_string(),
    })
}

pub fn sql(args: SqlArgs) -> anyhow::Result<()> {
    let mut registry = open_registry(&args.config)?;
    let db = registry.get_db_mut(&args.db)?;
    println!("{}", run_statement(db, &args.statement)?);
    Ok(())
}

pub fn tables(args: TablesArgs) -> anyhow::Result<()> {
    let mut registry = open_registry(&args.config)?;
    let db = registry.get_db_mut(&args.db)?;
    for table in db.show_tables()? {
        println!("{table}");
    }
    Ok(())
}

fn apply(opts: &mut OptionStore, clauses: &Clauses) {
    if clauses.distinct {
        opts.distinct();
    }
    if let Some(field) = &clauses.field {
        opts.field(field.as_str());
    }
    if let Some(join) = &clauses.join {
        opts.join(join.as_str());
    }
    if let Some(filter) = &clauses.where_ {
        opts.where_(filter.clone());
    }
    if let Some(group) = &clauses.group {
        opts.group(group.as_str());
    }
    if let Some(having) = &clauses.having {
        opts.having(having.clone());
    }
    if let Some(order) = &clauses.order {
        opts.order(order.as_str());
    }
    if let Some(limit) = &clauses.limit {
        opts.limit(limit.clone());
    }
    if let Some(data) = &clauses.data {
        opts.data(data.clone());
    }
    if let (Some(columns), Some(rows)) = (&clauses.columns, &clauses.rows) {
        opts.data_rows(columns.clone(), rows.clone());
    }
}

/// Build the statement text without opening a database.
pub fn build(args: &BuildArgs) -> anyhow::Result<String> {
    let mut opts = OptionStore::new();
    apply(&mut opts, &args.clauses);
    Ok(builder::build(
        args.kind,
        &args.table,
        &args.count_key,
        &opts,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Command, parse_args};
    use chainsql::{DbConfig, Limit, StatementKind};
    use serde_json::json;

    fn build_args(kind: StatementKind, table: &str, clauses: Clauses) -> BuildArgs {
        BuildArgs {
            kind,
            table: table.to_string(),
            count_key: builder::DEFAULT_COUNT_KEY.to_string(),
            clauses,
        }
    }

    #[test]
    fn build_select_from_flags() {
        let args = build_args(
            StatementKind::Select,
            "user",
            Clauses {
                field: Some("id,user_name".to_string()),
                where_: Some(json!({"age": 18})),
                order: Some("id desc".to_string()),
                limit: Some(Limit::Text("0,10".to_string())),
                ..Clauses::default()
            },
        );
        assert_eq!(
            build(&args).unwrap(),
            r#"SELECT `id`,`user_name` FROM `user` WHERE `age`="18" ORDER BY id desc LIMIT 0,10"#
        );
    }

    fn build_from_argv(argv: &[&str]) -> anyhow::Result<String> {
        let argv: Vec<String> = std::iter::once("chainsql")
            .chain(argv.iter().copied())
            .map(str::to_string)
            .collect();
        let Command::Build(args) = parse_args(&argv)? else {
            panic!("expected build");
        };
        build(&args)
    }

    #[test]
    fn build_delete_with_row_limit() {
        assert_eq!(
            build_from_argv(&["build", "delete", "user", "--where", "id > 1", "--limit", "5"])
                .unwrap(),
            "DELETE FROM `user` WHERE id > 1 LIMIT 5"
        );
        assert_eq!(
            build_from_argv(&[
                "build",
                "update",
                "user",
                "--data",
                r#"{"age": 3}"#,
                "--limit=2",
            ])
            .unwrap(),
            r#"UPDATE `user` SET `age`="3" LIMIT 2"#
        );
    }

    #[test]
    fn build_delete_rejects_offset_limit() {
        let err =
            build_from_argv(&["build", "delete", "user", "--limit", "1,2"]).unwrap_err();
        assert_eq!(err.to_string(), "Limit type error, must be an integer.");
    }

    #[test]
    fn build_select_keeps_offset_limit() {
        assert_eq!(
            build_from_argv(&["build", "select", "user", "--limit", "20,10"]).unwrap(),
            "SELECT * FROM `user` LIMIT 20,10"
        );
    }

    #[test]
    fn build_multi_row_insert() {
        let args = build_args(
            StatementKind::Insert,
            "user",
            Clauses {
                columns: Some(json!(["id", "user_name"])),
                rows: Some(json!([[1, "zhangsan"], [2, "lisi"]])),
                ..Clauses::default()
            },
        );
        assert_eq!(
            build(&args).unwrap(),
            r#"INSERT INTO `user` (`id`,`user_name`) VALUES ("1","zhangsan"),("2","lisi")"#
        );
    }

    #[test]
    fn build_reports_shape_errors() {
        let args = build_args(
            StatementKind::Insert,
            "user",
            Clauses {
                data: Some(json!("oops")),
                ..Clauses::default()
            },
        );
        assert_eq!(
            build(&args).unwrap_err().to_string(),
            "Data type error, the first parameter must be an array."
        );
    }

    #[test]
    fn run_statement_prints_rows_and_counts() {
        let mut registry = Registry::with_default_connector();
        registry.build(DbConfig::sqlite(":memory:")).unwrap();
        let db = registry.get_db_mut(0).unwrap();

        run_statement(db, "CREATE TABLE t (id INTEGER PRIMARY KEY, n INTEGER)").unwrap();
        assert_eq!(run_statement(db, "INSERT INTO t (n) VALUES (7)").unwrap(), "1");
        assert_eq!(run_statement(db, "UPDATE t SET n = 8").unwrap(), "1");

        let printed = run_statement(db, "SELECT id, n FROM t").unwrap();
        let rows: serde_json::Value = serde_json::from_str(&printed).unwrap();
        assert_eq!(rows, json!([{"id": 1, "n": 8}]));
    }

    #[test]
    fn missing_config_names_the_file() {
        let err = open_registry(Path::new("/nonexistent/chainsql.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/chainsql.toml"));
    }
}
