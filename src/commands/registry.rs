//! Command registration table.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

use super::Handler;
use crate::normalizer::NormalizedCommand;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("command name or alias '{0}' is registered twice")]
    Duplicate(String),

    #[error("invalid word pattern for '{name}': {source}")]
    Pattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// How the token is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matching {
    /// Token equals the name or an alias.
    Exact,
    /// Body starts with the name followed by a word boundary (`.tts,hello`).
    Word,
}

/// Who may run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Public,
    /// Bot must be group admin; `sender_admin` additionally requires the
    /// sender to be admin (or the message to be self-sent).
    Admin { sender_admin: bool },
    /// Owner, sudo or self only.
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Any,
    GroupOnly,
}

/// One row of the table.
#[derive(Clone)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub matching: Matching,
    pub tier: Tier,
    pub scope: Scope,
    /// Show a typing indicator after the handler finishes.
    pub typing: bool,
    pub description: &'static str,
    pub handler: Arc<dyn Handler>,
}

impl CommandSpec {
    pub fn new(name: &'static str, handler: Arc<dyn Handler>) -> Self {
        Self {
            name,
            aliases: &[],
            matching: Matching::Exact,
            tier: Tier::Public,
            scope: Scope::Any,
            typing: false,
            description: "",
            handler,
        }
    }

    #[must_use]
    pub fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    #[must_use]
    pub fn word(mut self) -> Self {
        self.matching = Matching::Word;
        self
    }

    #[must_use]
    pub fn admin(mut self) -> Self {
        self.tier = Tier::Admin { sender_admin: false };
        self
    }

    /// Admin tier that also needs an admin sender.
    #[must_use]
    pub fn destructive(mut self) -> Self {
        self.tier = Tier::Admin { sender_admin: true };
        self
    }

    #[must_use]
    pub fn owner(mut self) -> Self {
        self.tier = Tier::Owner;
        self
    }

    #[must_use]
    pub fn group_only(mut self) -> Self {
        self.scope = Scope::GroupOnly;
        self
    }

    #[must_use]
    pub fn typing(mut self) -> Self {
        self.typing = true;
        self
    }

    #[must_use]
    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    fn names(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("matching", &self.matching)
            .field("tier", &self.tier)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Name and alias index over the registered specs.
///
/// Lookup is a hash hit on the token first; word-matched specs are then
/// tried against the body in registration order.
#[derive(Default)]
pub struct CommandRegistry {
    specs: Vec<CommandSpec>,
    index: HashMap<&'static str, usize>,
    word: Vec<(usize, Regex)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: CommandSpec) -> Result<(), RegistryError> {
        if let Some(taken) = spec.names().find(|n| self.index.contains_key(n)) {
            return Err(RegistryError::Duplicate(taken.to_string()));
        }

        let position = self.specs.len();
        if spec.matching == Matching::Word {
            let alternatives: Vec<String> = spec.names().map(regex::escape).collect();
            let pattern = format!(r"^(?:{})(?:\b|\s|$)", alternatives.join("|"));
            let re = Regex::new(&pattern).map_err(|source| RegistryError::Pattern {
                name: spec.name,
                source,
            })?;
            self.word.push((position, re));
        }
        for name in spec.names() {
            self.index.insert(name, position);
        }
        self.specs.push(spec);
        Ok(())
    }

    pub fn lookup(&self, command: &NormalizedCommand) -> Option<&CommandSpec> {
        if !command.is_command() {
            return None;
        }
        if let Some(&i) = self.index.get(command.token.as_str()) {
            return self.specs.get(i);
        }
        self.word
            .iter()
            .find(|(_, re)| re.is_match(&command.body))
            .and_then(|(i, _)| self.specs.get(*i))
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.index.get(name).and_then(|&i| self.specs.get(i))
    }

    pub fn specs(&self) -> &[CommandSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Unavailable;
    use crate::normalizer::parse_command;

    fn unavailable() -> Arc<dyn Handler> {
        Arc::new(Unavailable)
    }

    fn cmd(text: &str) -> NormalizedCommand {
        parse_command(text, text, &['.'])
    }

    #[test]
    fn test_exact_and_alias_lookup() {
        let mut registry = CommandRegistry::new();
        registry
            .register(CommandSpec::new("help", unavailable()).aliases(&["menu", "list"]))
            .unwrap();

        assert_eq!(registry.lookup(&cmd(".menu")).map(|s| s.name), Some("help"));
        assert_eq!(registry.lookup(&cmd(".help me")).map(|s| s.name), Some("help"));
        assert!(registry.lookup(&cmd(".helpme")).is_none());
        assert!(registry.lookup(&cmd("help")).is_none());
    }

    #[test]
    fn test_word_matching() {
        let mut registry = CommandRegistry::new();
        registry
            .register(CommandSpec::new("tts", unavailable()).word())
            .unwrap();

        assert_eq!(registry.lookup(&cmd(".tts,hello")).map(|s| s.name), Some("tts"));
        assert_eq!(registry.lookup(&cmd(".tts")).map(|s| s.name), Some("tts"));
        assert!(registry.lookup(&cmd(".ttsx")).is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = CommandRegistry::new();
        registry
            .register(CommandSpec::new("areact", unavailable()))
            .unwrap();
        let err = registry
            .register(CommandSpec::new("autoreact", unavailable()).aliases(&["areact"]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "areact"));
        assert_eq!(registry.len(), 1);
    }
}
