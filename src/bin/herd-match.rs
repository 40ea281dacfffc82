use anyhow::{anyhow, bail, Context};
use herd::config::{default_config_path, Config};
use herd::logger;
use herd::target::{evaluate_target, MatchError, TargetExpression};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "usage: herd-match [-c CONFIG] EXPRESSION...";

struct Args {
    config: PathBuf,
    expression: Vec<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut config = None;
    let mut expression = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or(anyhow!("{arg} requires a path to a config file"))?;
                config = Some(PathBuf::from(path));
            }
            "--" => {
                expression.extend(args.by_ref());
            }
            _ => expression.push(arg),
        }
    }

    if expression.is_empty() {
        bail!("herd-match requires a target expression, but none was provided\n{USAGE}");
    }
    Ok(Args {
        config: config.unwrap_or_else(default_config_path),
        expression,
    })
}

fn run() -> anyhow::Result<bool> {
    let args = parse_args(env::args().skip(1))?;
    let config = Config::load(&args.config)
        .with_context(|| format!("could not load configuration; {USAGE}"))?;
    logger::init(config.log_level.as_deref());

    let ctx = config.context();
    let engines = config.engines();
    let expression = TargetExpression::Words(args.expression);
    match evaluate_target(expression, &ctx, &engines, &config.nodegroups) {
        Ok(verdict) => Ok(verdict),
        Err(err @ MatchError::EngineExecutionFailure { .. }) => {
            tracing::error!(kind = err.kind(), "{err}");
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => {
            println!("true");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("false");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("herd-match: {err:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Args> {
        parse_args(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn keeps_expression_words_as_given() {
        let args = parse(&["-c", "/tmp/minion.yaml", "G@role:web server", "or", "db*"]).unwrap();
        assert_eq!(PathBuf::from("/tmp/minion.yaml"), args.config);
        assert_eq!(vec!["G@role:web server", "or", "db*"], args.expression);

        let tokens = TargetExpression::Words(args.expression).tokenize();
        assert_eq!(3, tokens.len());
    }

    #[test]
    fn double_dash_ends_options() {
        let args = parse(&["--", "-c", "web*"]).unwrap();
        assert_eq!(default_config_path(), args.config);
        assert_eq!(vec!["-c", "web*"], args.expression);
    }

    #[test]
    fn requires_an_expression() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["-c", "minion.yaml"]).is_err());
        assert!(parse(&["--config"]).is_err());
    }
}
