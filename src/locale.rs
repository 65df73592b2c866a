//! User-facing reply templates, keyed by dotted identifiers such as `fun.uptime.response`.

use crate::log_error;
use anyhow::{anyhow, Result};
use std::{collections::HashMap, path::Path, sync::Arc};

const DEFAULT_LOCALE: &str = "en";
const EN: &str = include_str!("../locale/en.toml");

/// One language's templates.  Placeholders are written `{name}`.
#[derive(Clone, Debug, Default)]
pub struct Locale(HashMap<String, String>);

impl Locale {
    pub fn from_toml(contents: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(contents)?;
        let mut templates = HashMap::new();
        flatten("", &table, &mut templates);
        Ok(Self(templates))
    }

    /// Layer `other` on top of `self`
    fn overlay(&self, other: Locale) -> Self {
        let mut templates = self.0.clone();
        templates.extend(other.0);
        Self(templates)
    }

    /// Raw template.  A missing key renders as the key itself so the reply is still sent.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        match self.0.get(key) {
            Some(template) => template.as_str(),
            None => {
                log_error!("Missing locale key `{}`", key);
                key
            }
        }
    }

    /// Fill the `{name}` placeholders of a template in one pass.  Values are copied as they are,
    /// so a value that looks like a placeholder stays untouched.  Unknown placeholders are kept.
    pub fn format(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut rest = self.get(key);
        let mut out = String::with_capacity(rest.len());

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|i| open + i) else {
                break;
            };
            out.push_str(&rest[..open]);
            let name = &rest[open + 1..close];
            match args.iter().find(|(arg, _)| *arg == name) {
                Some((_, value)) => out.push_str(value),
                None => out.push_str(&rest[open..=close]),
            }
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        out
    }
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut HashMap<String, String>) {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            toml::Value::Table(table) => flatten(&key, table, out),
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            other => {
                out.insert(key, other.to_string());
            }
        }
    }
}

/// All known languages, English being the fallback for everything.
pub struct Locales {
    default: Arc<Locale>,
    others: HashMap<String, Arc<Locale>>,
}

impl Locales {
    pub fn builtin() -> Self {
        Self {
            // The embedded file is part of the build and covered by tests.
            default: Arc::new(Locale::from_toml(EN).unwrap_or_default()),
            others: HashMap::new(),
        }
    }

    /// Builtin English plus every `<lang>.toml` in `dir`
    pub async fn load(dir: Option<&Path>) -> Result<Self> {
        let mut locales = Self::builtin();
        let Some(dir) = dir else {
            return Ok(locales);
        };

        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
            anyhow!(
                "Could not read locale directory `{}`: {}",
                dir.to_string_lossy(),
                e
            )
        })?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            let Some(lang) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let contents = tokio::fs::read_to_string(&path).await?;
            let locale = Locale::from_toml(&contents).map_err(|e| {
                anyhow!(
                    "Could not parse locale `{}`: {}",
                    path.to_string_lossy(),
                    e
                )
            })?;
            locales.insert(lang, locale);
        }

        Ok(locales)
    }

    pub fn insert(&mut self, lang: &str, locale: Locale) {
        let layered = self.default.overlay(locale);
        self.others.insert(lang.to_owned(), Arc::new(layered));
    }

    pub fn get(&self, lang: Option<&str>) -> Arc<Locale> {
        match lang {
            Some(lang) if lang != DEFAULT_LOCALE => self
                .others
                .get(lang)
                .cloned()
                .unwrap_or_else(|| self.default.clone()),
            _ => self.default.clone(),
        }
    }
}
