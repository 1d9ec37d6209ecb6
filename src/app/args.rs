use super::error::AppError;
use crate::domain::{Filter, Key, Query};

pub const USAGE: &str = "Usage: keychunk <records.csv> <kind> [--chunk-size N] [--ancestor KIND:ID] \
[--where FIELD=VALUE]... [--fields a,b,c] [--tolerate]";

/// Parsed command-line arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub input: String,
    pub kind: String,
    pub chunk_size: usize,
    pub ancestor: Option<Key>,
    pub filters: Vec<Filter>,
    pub fields: Vec<String>,
    pub tolerate: bool,
}

impl Args {
    /// Parse `std::env::args()`-style input (program name first)
    pub fn parse(args: Vec<String>) -> Result<Self, AppError> {
        let mut positional = Vec::new();
        let mut chunk_size = 0;
        let mut ancestor = None;
        let mut filters = Vec::new();
        let mut fields = Vec::new();
        let mut tolerate = false;

        let mut iter = args.into_iter().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--tolerate" => tolerate = true,
                "--chunk-size" => {
                    let value = flag_value(&mut iter, &arg)?;
                    chunk_size = value.parse().map_err(|_| {
                        AppError::InvalidArguments(format!("--chunk-size expects a number, got {value:?}"))
                    })?;
                }
                "--ancestor" => ancestor = Some(Key::parse(&flag_value(&mut iter, &arg)?)?),
                "--where" => filters.push(Filter::parse(&flag_value(&mut iter, &arg)?)?),
                "--fields" => {
                    fields = flag_value(&mut iter, &arg)?
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(String::from)
                        .collect();
                }
                flag if flag.starts_with("--") => {
                    return Err(AppError::InvalidArguments(format!("unknown flag {flag}\n{USAGE}")));
                }
                _ => positional.push(arg),
            }
        }

        let [input, kind]: [String; 2] = positional
            .try_into()
            .map_err(|_| AppError::InvalidArguments(USAGE.to_string()))?;

        Ok(Self {
            input,
            kind,
            chunk_size,
            ancestor,
            filters,
            fields,
            tolerate,
        })
    }

    /// The query these arguments describe
    pub fn query(&self) -> Query {
        let mut query = Query::new(self.kind.clone());
        if let Some(ancestor) = &self.ancestor {
            query = query.ancestor(ancestor.clone());
        }
        for filter in &self.filters {
            query = query.with_filter(filter.clone());
        }
        query
    }
}

fn flag_value(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, AppError> {
    iter.next()
        .ok_or_else(|| AppError::InvalidArguments(format!("{flag} expects a value")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FilterOp, Value};

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("keychunk")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn parses_positionals_with_defaults() {
        let args = Args::parse(argv(&["records.csv", "Item"])).unwrap();
        assert_eq!(args.input, "records.csv");
        assert_eq!(args.kind, "Item");
        assert_eq!(args.chunk_size, 0);
        assert!(!args.tolerate);
        assert!(args.filters.is_empty());
    }

    #[test]
    fn parses_all_flags() {
        let args = Args::parse(argv(&[
            "--chunk-size",
            "10",
            "records.csv",
            "--ancestor",
            "Parent:1",
            "Item",
            "--where",
            "name=B",
            "--fields",
            "name, score",
            "--tolerate",
        ]))
        .unwrap();

        assert_eq!(args.chunk_size, 10);
        assert_eq!(args.ancestor, Some(Key::new("Parent", 1)));
        assert_eq!(args.fields, vec!["name".to_string(), "score".to_string()]);
        assert!(args.tolerate);

        let query = args.query();
        assert_eq!(query.kind(), "Item");
        assert_eq!(query.ancestor_key(), Some(&Key::new("Parent", 1)));
        assert_eq!(query.filters()[0].op, FilterOp::Eq);
        assert_eq!(query.filters()[0].value, Value::from("B"));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Args::parse(argv(&["records.csv"])).is_err());
        assert!(Args::parse(argv(&["a", "b", "c"])).is_err());
        assert!(Args::parse(argv(&["a", "b", "--chunk-size", "ten"])).is_err());
        assert!(Args::parse(argv(&["a", "b", "--chunk-size"])).is_err());
        assert!(Args::parse(argv(&["a", "b", "--bogus"])).is_err());
        assert!(matches!(
            Args::parse(argv(&["a", "b", "--ancestor", "nokind"])),
            Err(AppError::Domain(_))
        ));
    }
}
