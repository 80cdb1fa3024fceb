//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings (char-boundary aware).
pub fn trunc_for_log(s: &str, max_chars: usize) -> String {
  match s.char_indices().nth(max_chars) {
    None => s.to_string(),
    Some((cut, _)) => format!("{}… ({} bytes total)", &s[..cut], s.len()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_every_occurrence() {
    assert_eq!(fill_template("{a}+{a}={b}", &[("a", "2"), ("b", "4")]), "2+2=4");
    assert_eq!(fill_template("no keys", &[("a", "1")]), "no keys");
  }

  #[test]
  fn truncation_respects_multibyte_chars() {
    assert_eq!(trunc_for_log("6×4", 10), "6×4");
    assert_eq!(trunc_for_log("6×4=24", 2), "6×… (7 bytes total)");
  }
}
