//! What a hook process knows about its invocation.
//!
//! The same variables reach the child two ways: as `HKW_*` environment
//! variables, and as `{name}` placeholders in inline commands.
//!
//! | placeholder      | environment          |
//! |------------------|----------------------|
//! | `{event_type}`   | `HKW_EVENT_TYPE`     |
//! | `{event_id}`     | `HKW_EVENT_ID`       |
//! | `{hook_name}`    | `HKW_HOOK_NAME`      |
//! | `{project_root}` | `HKW_PROJECT_ROOT`   |
//! | `{task_id}`      | `HKW_TASK_ID`        |
//! | `{spec_id}`      | `HKW_SPEC_ID`        |
//! | `{<key>}`        | `HKW_CTX_<KEY>`      |
//!
//! Placeholders may also use the environment spelling (`{HKW_TASK_ID}`,
//! `{HKW_CTX_BRANCH}`). Identity variables shadow context keys of the same
//! name. Task and spec ids are absent unless the event carries them.
//!
//! The environment is layered on top of the inherited one, lowest priority
//! first:
//! 1. `HKW_CTX_<KEY>` for every event context entry
//! 2. the hook's own `env` table
//! 3. the identity variables, which a hook cannot override

use crate::definition::HookDefinition;
use hkw_core::Event;
use std::collections::BTreeMap;
use std::path::Path;

pub const ENV_EVENT_TYPE: &str = "HKW_EVENT_TYPE";
pub const ENV_EVENT_ID: &str = "HKW_EVENT_ID";
pub const ENV_HOOK_NAME: &str = "HKW_HOOK_NAME";
pub const ENV_PROJECT_ROOT: &str = "HKW_PROJECT_ROOT";
pub const ENV_TASK_ID: &str = "HKW_TASK_ID";
pub const ENV_SPEC_ID: &str = "HKW_SPEC_ID";
pub const CONTEXT_PREFIX: &str = "HKW_CTX_";

/// `(placeholder, environment variable)` for every identity variable.
const IDENTITY: [(&str, &str); 6] = [
    ("event_type", ENV_EVENT_TYPE),
    ("event_id", ENV_EVENT_ID),
    ("hook_name", ENV_HOOK_NAME),
    ("project_root", ENV_PROJECT_ROOT),
    ("task_id", ENV_TASK_ID),
    ("spec_id", ENV_SPEC_ID),
];

/// `HKW_CTX_` plus the key upper-cased, non-alphanumerics mapped to `_`.
pub fn context_var_name(key: &str) -> String {
    let mut name = String::with_capacity(CONTEXT_PREFIX.len() + key.len());
    name.push_str(CONTEXT_PREFIX);
    name.extend(key.chars().map(|c| {
        if c.is_ascii_alphanumeric() {
            c.to_ascii_uppercase()
        } else {
            '_'
        }
    }));
    name
}

/// Variables for one hook run against one event.
pub(crate) struct HookVariables<'a> {
    event: &'a Event,
    hook: &'a HookDefinition,
    project_root: &'a Path,
}

impl<'a> HookVariables<'a> {
    pub(crate) fn new(event: &'a Event, hook: &'a HookDefinition, project_root: &'a Path) -> Self {
        Self {
            event,
            hook,
            project_root,
        }
    }

    fn identity(&self, placeholder: &str) -> Option<String> {
        match placeholder {
            "event_type" => Some(self.event.event_type.clone()),
            "event_id" => Some(self.event.id.to_string()),
            "hook_name" => Some(self.hook.name.clone()),
            "project_root" => Some(self.project_root.display().to_string()),
            "task_id" => self.event.task_id.clone(),
            "spec_id" => self.event.spec_id.clone(),
            _ => None,
        }
    }

    /// Value of a placeholder, in either spelling.
    pub(crate) fn lookup(&self, name: &str) -> Option<String> {
        if let Some((placeholder, _)) = IDENTITY
            .iter()
            .find(|(placeholder, env)| *placeholder == name || *env == name)
        {
            return self.identity(placeholder);
        }
        if name.starts_with(CONTEXT_PREFIX) {
            return self
                .event
                .context
                .iter()
                .find(|(key, _)| context_var_name(key) == name)
                .map(|(_, value)| value.clone());
        }
        self.event.context.get(name).cloned()
    }

    pub(crate) fn environment(&self) -> BTreeMap<String, String> {
        let mut env: BTreeMap<String, String> = self
            .event
            .context
            .iter()
            .map(|(key, value)| (context_var_name(key), value.clone()))
            .collect();

        env.extend(self.hook.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        for (placeholder, name) in IDENTITY {
            if let Some(value) = self.identity(placeholder) {
                env.insert(name.to_string(), value);
            }
        }
        env
    }

    /// Replace each known `{name}` in `template` with its single-quoted
    /// value. Values are never rescanned; unknown placeholders and an
    /// unclosed `{` stay as written.
    pub(crate) fn render_command(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            match self.lookup(&after[..close]) {
                Some(value) => out.push_str(&sh_quote(&value)),
                None => out.push_str(&rest[open..open + close + 2]),
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out
    }
}

/// `value` as one `sh` word.
fn sh_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::HookAction;

    fn hook(name: &str) -> HookDefinition {
        HookDefinition::new(name, HookAction::Command("true".to_string()))
    }

    #[test]
    fn test_context_var_name() {
        assert_eq!(context_var_name("branch"), "HKW_CTX_BRANCH");
        assert_eq!(context_var_name("pr-url"), "HKW_CTX_PR_URL");
        assert_eq!(context_var_name("a.b c"), "HKW_CTX_A_B_C");
        assert_eq!(context_var_name("naïve"), "HKW_CTX_NA_VE");
    }

    #[test]
    fn test_environment_precedence() {
        let event = Event::new("task.created")
            .with_context("branch", "feature")
            .with_context("level", "low")
            .with_task_id("task-42");
        let hook = hook("notify")
            .with_env("HKW_CTX_LEVEL", "high")
            .with_env("HKW_EVENT_TYPE", "spoofed")
            .with_env("CHANNEL", "#ci");

        let env = HookVariables::new(&event, &hook, Path::new("/repo")).environment();

        assert_eq!(env["HKW_CTX_BRANCH"], "feature");
        assert_eq!(env["HKW_CTX_LEVEL"], "high");
        assert_eq!(env["CHANNEL"], "#ci");
        assert_eq!(env[ENV_EVENT_TYPE], "task.created");
        assert_eq!(env[ENV_EVENT_ID], event.id.to_string());
        assert_eq!(env[ENV_HOOK_NAME], "notify");
        assert_eq!(env[ENV_PROJECT_ROOT], "/repo");
        assert_eq!(env[ENV_TASK_ID], "task-42");
        assert!(!env.contains_key(ENV_SPEC_ID));
    }

    #[test]
    fn test_lookup_accepts_both_spellings() {
        let event = Event::new("task.created")
            .with_context("event_type", "spoofed")
            .with_context("pr-url", "https://x/1")
            .with_task_id("task-42");
        let hook = hook("lint");
        let vars = HookVariables::new(&event, &hook, Path::new("/repo"));

        assert_eq!(vars.lookup("event_type").as_deref(), Some("task.created"));
        assert_eq!(vars.lookup("HKW_EVENT_TYPE").as_deref(), Some("task.created"));
        assert_eq!(vars.lookup("task_id").as_deref(), Some("task-42"));
        assert_eq!(vars.lookup("HKW_TASK_ID").as_deref(), Some("task-42"));
        assert_eq!(vars.lookup("pr-url").as_deref(), Some("https://x/1"));
        assert_eq!(vars.lookup("HKW_CTX_PR_URL").as_deref(), Some("https://x/1"));
        assert_eq!(vars.lookup("spec_id"), None);
        assert_eq!(vars.lookup("HKW_CTX_MISSING"), None);
    }

    #[test]
    fn test_placeholders_match_environment() {
        let event = Event::new("task.created")
            .with_context("branch", "main")
            .with_spec_id("spec-7");
        let hook = hook("lint");
        let vars = HookVariables::new(&event, &hook, Path::new("/repo"));
        let env = vars.environment();

        for (placeholder, name) in IDENTITY {
            assert_eq!(vars.lookup(placeholder), env.get(name).cloned(), "{placeholder}");
        }
        assert_eq!(vars.lookup("branch"), env.get("HKW_CTX_BRANCH").cloned());
    }

    #[test]
    fn test_render_quotes_values() {
        let event = Event::new("task.created")
            .with_context("branch", "main; rm -rf /")
            .with_context("msg", "it's $HOME `ls`")
            .with_task_id("task-42");
        let hook = hook("push");
        let vars = HookVariables::new(&event, &hook, Path::new("/repo"));

        assert_eq!(
            vars.render_command("git push origin {branch} # {HKW_TASK_ID}"),
            "git push origin 'main; rm -rf /' # 'task-42'"
        );
        assert_eq!(vars.render_command("echo {msg}"), "echo 'it'\\''s $HOME `ls`'");
    }

    #[test]
    fn test_render_is_single_pass() {
        let event = Event::new("task.created")
            .with_context("name", "{task_id}")
            .with_task_id("INJECTED");
        let hook = hook("echo");
        let vars = HookVariables::new(&event, &hook, Path::new("/repo"));
        assert_eq!(vars.render_command("echo {name}"), "echo '{task_id}'");
    }

    #[test]
    fn test_render_leaves_unknown_and_unclosed() {
        let event = Event::new("task.created");
        let hook = hook("echo");
        let vars = HookVariables::new(&event, &hook, Path::new("/repo"));

        assert_eq!(vars.render_command("echo {unknown} {spec_id}"), "echo {unknown} {spec_id}");
        assert_eq!(vars.render_command("echo {unclosed"), "echo {unclosed");
        assert_eq!(vars.render_command("awk '{print $1}'"), "awk '{print $1}'");
        assert_eq!(vars.render_command(""), "");
    }
}
