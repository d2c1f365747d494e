//! Template-family folding: strips every balanced `<...>` substring from a symbol name
//! (spec.md §3, §4.5, §9).

/// Strips every balanced `<...>` substring from `name`, returning the stripped name.
///
/// A `<` that never finds its matching `>` (common in operator names like `operator<`) ends the
/// strip there: everything from that `<` onward is left untouched rather than erroring, per
/// spec.md §9. The result is idempotent: `strip(strip(n)) == strip(n)`.
pub fn strip_template_params(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' {
            match matching_close(bytes, i) {
                Some(close) => {
                    i = close + 1;
                }
                None => {
                    out.push_str(&name[i..]);
                    break;
                }
            }
        } else {
            let ch_len = name[i..].chars().next().map_or(1, char::len_utf8);
            out.push_str(&name[i..i + ch_len]);
            i += ch_len;
        }
    }
    out
}

/// Returns the index of the `>` that balances the `<` at `open`, tracking nested depth, or
/// `None` if the brackets never balance.
fn matching_close(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Whether `name` contains at least one balanced `<...>` range (i.e. stripping it changes it).
pub fn is_templated(name: &str) -> bool {
    strip_template_params(name) != name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_simple_instantiation() {
        assert_eq!(strip_template_params("Foo<int>"), "Foo");
        assert_eq!(strip_template_params("Foo<int>::bar"), "Foo::bar");
    }

    #[test]
    fn strips_nested_brackets() {
        assert_eq!(strip_template_params("Foo<Bar<int>>"), "Foo");
    }

    #[test]
    fn non_templated_name_is_unchanged() {
        assert_eq!(strip_template_params("plain_name"), "plain_name");
        assert!(!is_templated("plain_name"));
    }

    #[test]
    fn unbalanced_left_bracket_leaves_tail_verbatim() {
        assert_eq!(strip_template_params("operator<"), "operator<");
        assert_eq!(strip_template_params("operator<="), "operator<=");
    }

    #[test]
    fn stripping_is_idempotent() {
        for name in ["Foo<int>", "Foo<Bar<int>, Baz>::method<T>", "operator<", "plain"] {
            let once = strip_template_params(name);
            let twice = strip_template_params(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn three_instantiations_fold_to_one_family() {
        let names = ["Foo<int>", "Foo<long>", "Foo<float>"];
        let families: Vec<_> = names.iter().map(|n| strip_template_params(n)).collect();
        assert!(families.iter().all(|f| f == "Foo"));
    }
}
