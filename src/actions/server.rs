//! `ServerChangeEvent`: move the build to another config server.
//!
//! Arguments are `[server]` or `[server, root_path]`. Running it updates the
//! build's config server and hands the engine a redirect to the new root.
//! The engine abandons whatever it was processing and starts over there.

use super::{check_arity, str_arg, Action, Arity, DirectiveArgs, Signal};
use crate::buildinfo::BuildInfo;
use crate::error::{ActionError, ValidationError};
use crate::transport::join_root;
use serde_yaml::Value;
use tracing::info;

pub const NAME: &str = "ServerChangeEvent";

#[derive(Debug)]
pub struct ServerChangeEvent {
    args: DirectiveArgs,
}

impl ServerChangeEvent {
    pub fn new(data: &Value) -> Self {
        Self {
            args: DirectiveArgs::resolve(data, Arity::Single),
        }
    }

    fn target(&self) -> Result<(&str, &str), String> {
        let DirectiveArgs::Single(args) = &self.args else {
            return Err("arguments must be a list".to_string());
        };
        check_arity(args, 1, 2)?;
        let server = str_arg(args, 0, "server")?;
        let root_path = match args.get(1) {
            Some(_) => str_arg(args, 1, "root path")?,
            None => "",
        };
        Ok((server, root_path))
    }
}

impl Action for ServerChangeEvent {
    fn name(&self) -> &str {
        NAME
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.target()
            .map(|_| ())
            .map_err(|reason| ValidationError::new(NAME, reason))
    }

    fn run(&self, build: &mut BuildInfo) -> Result<Signal, ActionError> {
        let (server, root_path) = self
            .target()
            .map_err(|reason| ActionError::new(NAME, reason))?;

        let root = join_root(server, root_path);
        info!("Config server changed to '{}', restarting at '{}'", server, root);
        build.set_config_server(server);
        Ok(Signal::Redirect(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FactTable;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_redirect_with_root_path() {
        let mut build = BuildInfo::new(FactTable::new());
        let action = ServerChangeEvent::new(&yaml("['https://new-server.example.com', '/config']"));

        action.validate().unwrap();
        let signal = action.run(&mut build).unwrap();

        assert_eq!(
            signal,
            Signal::Redirect("https://new-server.example.com/config".to_string())
        );
        assert_eq!(build.config_server(), "https://new-server.example.com");
    }

    #[test]
    fn test_redirect_to_server_only() {
        let mut build = BuildInfo::new(FactTable::new());
        let signal = ServerChangeEvent::new(&yaml("['/mnt/alt']"))
            .run(&mut build)
            .unwrap();
        assert_eq!(signal, Signal::Redirect("/mnt/alt".to_string()));
    }

    #[test]
    fn test_validation() {
        assert!(ServerChangeEvent::new(&yaml("server")).validate().is_err());
        assert!(ServerChangeEvent::new(&yaml("[]")).validate().is_err());
        assert!(ServerChangeEvent::new(&yaml("[a, b, c]")).validate().is_err());
        assert!(ServerChangeEvent::new(&yaml("[a, 1]")).validate().is_err());
        assert!(ServerChangeEvent::new(&yaml("[a]")).validate().is_ok());
        assert!(ServerChangeEvent::new(&yaml("[a, b]")).validate().is_ok());
    }

    #[test]
    fn test_invalid_args_do_not_touch_build() {
        let mut build = BuildInfo::new(FactTable::new()).with_config_server("old");
        assert!(ServerChangeEvent::new(&yaml("[]")).run(&mut build).is_err());
        assert_eq!(build.config_server(), "old");
    }
}
