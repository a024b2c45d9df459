/// Rally participation site backend.
#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
pub(crate) struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Default)]
pub(crate) enum Command {
    /// Runs the HTTP server
    #[default]
    Serve,
    /// Applies database migrations and exits
    Migrate,
    /// Grants admin rights to an existing user, bypassing the HTTP API
    Promote { email: String },
    /// Revokes admin rights from a user
    Demote { email: String },
    /// Lists every admin account
    ListAdmins,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn no_subcommand_means_serve() {
        let args = Args::parse_from(["rally"]);
        assert!(matches!(args.command.unwrap_or_default(), Command::Serve));
    }

    #[test]
    fn promote_takes_an_email() {
        let args = Args::parse_from(["rally", "promote", "ada@x.com"]);
        match args.command {
            Some(Command::Promote { email }) => assert_eq!(email, "ada@x.com"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
