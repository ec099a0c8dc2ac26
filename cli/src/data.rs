use std::path::PathBuf;

use renderer::{Bindings, Loop};

/// Build a binding set from TOML data files (in order) and `NAME=VALUE`
/// overrides. Later sources replace earlier ones.
pub fn load(files: &[PathBuf], vars: &[String]) -> Result<Bindings, String> {
    let mut bindings = Bindings::new();
    for file in files {
        let text = std::fs::read_to_string(file)
            .map_err(|e| format!("cannot read '{}': {}", file.display(), e))?;
        let table: toml::Table = toml::from_str(&text)
            .map_err(|e| format!("TOML parse error in '{}': {}", file.display(), e))?;
        merge_table(&mut bindings, &table)
            .map_err(|e| format!("{}: {}", file.display(), e))?;
    }
    for var in vars {
        let (name, value) = parse_var(var)?;
        bindings.set(name, value);
    }
    Ok(bindings)
}

/// Convert a TOML table into a fresh binding set.
pub fn from_table(table: &toml::Table) -> Result<Bindings, String> {
    let mut bindings = Bindings::new();
    merge_table(&mut bindings, table)?;
    Ok(bindings)
}

/// Scalars become variables (`true`/`false` as `"1"`/`"0"`), arrays of
/// tables become loops.
fn merge_table(bindings: &mut Bindings, table: &toml::Table) -> Result<(), String> {
    for (key, value) in table {
        match value {
            toml::Value::String(s) => bindings.set(key, s),
            toml::Value::Integer(n) => bindings.set(key, n.to_string()),
            toml::Value::Float(f) => bindings.set(key, f.to_string()),
            toml::Value::Boolean(b) => bindings.set(key, if *b { "1" } else { "0" }),
            toml::Value::Datetime(d) => bindings.set(key, d.to_string()),
            toml::Value::Array(items) => {
                let children = items
                    .iter()
                    .map(|item| match item {
                        toml::Value::Table(t) => {
                            from_table(t).map_err(|e| format!("{}: {}", key, e))
                        }
                        other => Err(format!(
                            "'{}': loop items must be tables, found {}",
                            key,
                            other.type_str()
                        )),
                    })
                    .collect::<Result<Loop, String>>()?;
                *bindings.add_loop(key) = children;
            }
            toml::Value::Table(_) => {
                return Err(format!(
                    "'{}': tables are only allowed as loop items ([[{}]])",
                    key, key
                ));
            }
        }
    }
    Ok(())
}

/// Split a `NAME=VALUE` command-line override.
pub fn parse_var(s: &str) -> Result<(&str, &str), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name, value)),
        _ => Err(format!("invalid variable '{}': expected NAME=VALUE", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(src: &str) -> toml::Table {
        toml::from_str(src).expect("bad TOML in test")
    }

    #[test]
    fn scalars_are_stringified() {
        let b = from_table(&table(
            "title = \"Home\"\ncount = 3\nratio = 1.5\nshow = true\nhide = false",
        ))
        .unwrap();
        assert_eq!(b.get_str("title"), Some("Home"));
        assert_eq!(b.get_str("count"), Some("3"));
        assert_eq!(b.get_str("ratio"), Some("1.5"));
        assert_eq!(b.get_str("show"), Some("1"));
        assert_eq!(b.get_str("hide"), Some("0"));
        assert!(b.condition("show"));
        assert!(!b.condition("hide"));
    }

    #[test]
    fn arrays_of_tables_become_nested_loops() {
        let b = from_table(&table(
            r#"
            [[links]]
            href = "/a"
            [[links.children]]
            name = "x"

            [[links]]
            href = "/b"
            "#,
        ))
        .unwrap();
        let links = b.get_loop("links").expect("loop missing");
        assert_eq!(links.len(), 2);
        let first = links.iter().next().unwrap();
        assert_eq!(first.get_str("href"), Some("/a"));
        assert_eq!(first.get_loop("children").map(Loop::len), Some(1));
    }

    #[test]
    fn empty_array_is_an_empty_loop() {
        let b = from_table(&table("items = []")).unwrap();
        assert!(b.get_loop("items").is_some_and(Loop::is_empty));
    }

    #[test]
    fn rejects_unsupported_shapes() {
        assert!(from_table(&table("xs = [1, 2]")).is_err());
        assert!(from_table(&table("[section]\na = 1")).is_err());
    }

    #[test]
    fn var_overrides_split_on_first_equals() {
        assert_eq!(parse_var("a=b=c"), Ok(("a", "b=c")));
        assert_eq!(parse_var("empty="), Ok(("empty", "")));
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }

    #[test]
    fn later_sources_win() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let first = dir.path().join("a.toml");
        let second = dir.path().join("b.toml");
        std::fs::write(&first, "title = \"one\"\n[[l]]\nn = 1\n[[l]]\nn = 2\n").unwrap();
        std::fs::write(&second, "title = \"two\"\n[[l]]\nn = 3\n").unwrap();

        let b = load(&[first, second], &["extra=1".to_string(), "title=three".to_string()]).unwrap();
        assert_eq!(b.get_str("title"), Some("three"));
        assert_eq!(b.get_str("extra"), Some("1"));
        assert_eq!(b.get_loop("l").map(Loop::len), Some(1));
    }
}
