//! Fully qualified package names.

use std::fmt;
use std::str::FromStr;

use super::RegistryError;
use crate::consts::{DEFAULT_DOMAIN, DEFAULT_GROUP, DEFAULT_TAG};
use crate::keys::KeyScope;

/// `[domain/]group/name[:tag]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName {
  pub domain: String,
  pub group: String,
  pub name: String,
  pub tag: String,
}

impl PackageName {
  pub fn parse(input: &str) -> Result<Self, RegistryError> {
    let invalid = |reason: &str| RegistryError::InvalidName {
      name: input.to_string(),
      reason: reason.to_string(),
    };

    let input_trimmed = input.trim();
    if input_trimmed.is_empty() {
      return Err(invalid("name is empty"));
    }

    // a tag separator only counts after the last path separator
    let last_slash = input_trimmed.rfind('/').map(|i| i + 1).unwrap_or(0);
    let (path, tag) = match input_trimmed[last_slash..].find(':') {
      Some(i) => (&input_trimmed[..last_slash + i], &input_trimmed[last_slash + i + 1..]),
      None => (input_trimmed, DEFAULT_TAG),
    };

    let segments: Vec<&str> = path.split('/').collect();
    let (domain, group, name) = match segments.as_slice() {
      [name] => (DEFAULT_DOMAIN, DEFAULT_GROUP, *name),
      [group, name] => (DEFAULT_DOMAIN, *group, *name),
      [domain, group, name] => (*domain, *group, *name),
      _ => return Err(invalid("expected [domain/]group/name[:tag]")),
    };

    for (label, segment) in [("domain", domain), ("group", group), ("name", name), ("tag", tag)] {
      if segment.is_empty() {
        return Err(invalid(&format!("{label} is empty")));
      }
      if !segment
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
      {
        return Err(invalid(&format!(
          "{label} '{segment}' may only contain lowercase letters, digits, '-', '_' and '.'"
        )));
      }
    }

    Ok(Self {
      domain: domain.to_string(),
      group: group.to_string(),
      name: name.to_string(),
      tag: tag.to_string(),
    })
  }

  /// Filesystem safe rendering used for export files.
  pub fn file_stem(&self) -> String {
    self
      .to_string()
      .chars()
      .map(|c| if matches!(c, '/' | '.' | '-' | ':') { '_' } else { c })
      .collect()
  }

  pub fn key_scope(&self) -> KeyScope {
    KeyScope::Package {
      group: self.group.clone(),
      name: self.name.clone(),
    }
  }
}

impl fmt::Display for PackageName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}/{}:{}", self.domain, self.group, self.name, self.tag)
  }
}

impl FromStr for PackageName {
  type Err = RegistryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_fill_missing_parts() {
    let n = PackageName::parse("web").unwrap();
    assert_eq!(n.to_string(), "artisan.library/library/web:latest");

    let n = PackageName::parse("acme/web:1.2").unwrap();
    assert_eq!(n.group, "acme");
    assert_eq!(n.tag, "1.2");
    assert_eq!(n.domain, DEFAULT_DOMAIN);
  }

  #[test]
  fn fully_qualified_round_trips() {
    let input = "registry.example.com/acme/web:v1";
    assert_eq!(PackageName::parse(input).unwrap().to_string(), input);
  }

  #[test]
  fn domain_dots_are_not_tags() {
    let n = PackageName::parse("my.domain/acme/web").unwrap();
    assert_eq!(n.domain, "my.domain");
    assert_eq!(n.tag, DEFAULT_TAG);
  }

  #[test]
  fn invalid_names_are_rejected() {
    for bad in ["", "Upper/case", "a/b/c/d", "acme/", "acme/web:", "acme/we b"] {
      assert!(
        matches!(PackageName::parse(bad), Err(RegistryError::InvalidName { .. })),
        "{bad:?} should be invalid"
      );
    }
  }

  #[test]
  fn file_stem_is_filesystem_safe() {
    let n = PackageName::parse("a.b/acme/my-app:1.0").unwrap();
    assert_eq!(n.file_stem(), "a_b_acme_my_app_1_0");
  }
}
