use crate::cli::actions::Action;
use anyhow::{Context, Result};

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches
            .get_one("dsn")
            .map(|s: &String| s.to_string())
            .context("missing required argument: --dsn")?,
        jwt_secret: matches
            .get_one("jwt-secret")
            .map(|s: &String| s.to_string())
            .context("missing required argument: --jwt-secret")?,
    })
}

#[cfg(test)]
mod tests {
    use super::handler;
    use crate::cli::{actions::Action, commands};

    #[test]
    fn handler_builds_server_action() {
        let matches = commands::new().get_matches_from(vec![
            "famgate",
            "--dsn",
            "postgres://localhost/famgate",
            "--jwt-secret",
            "sekret",
        ]);
        let action = handler(&matches).expect("action");
        let Action::Server {
            port,
            dsn,
            jwt_secret,
        } = action;
        assert_eq!(port, 8080);
        assert_eq!(dsn, "postgres://localhost/famgate");
        assert_eq!(jwt_secret, "sekret");
    }
}
