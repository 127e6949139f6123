//! Natural ("human") ordering of entry names.
//!
//! Runs of ASCII digits compare by numeric value, everything else compares
//! case-insensitively one character at a time, so `image_2` sorts before
//! `image_10` and `Cover` sits next to `cover`. Names that are equal under
//! those rules fall back to a plain byte comparison, which keeps the order
//! total and deterministic.

use std::cmp::Ordering;

/// Split a leading run of ASCII digits off `s`.
fn split_digits(s: &str) -> (&str, &str) {
    let end = s.bytes().position(|b| !b.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

/// Compare two digit runs by numeric value, without overflow for long runs.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Total natural ordering of two names.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut ra, mut rb) = (a, b);

    loop {
        let (Some(ca), Some(cb)) = (ra.chars().next(), rb.chars().next()) else {
            break;
        };

        if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let (na, rest_a) = split_digits(ra);
            let (nb, rest_b) = split_digits(rb);
            match cmp_digit_runs(na, nb) {
                Ordering::Equal => {}
                ord => return ord,
            }
            ra = rest_a;
            rb = rest_b;
        } else {
            match ca.to_lowercase().cmp(cb.to_lowercase()) {
                Ordering::Equal => {}
                ord => return ord,
            }
            ra = &ra[ca.len_utf8()..];
            rb = &rb[cb.len_utf8()..];
        }
    }

    // Whichever side still has characters is the longer one.
    match (ra.is_empty(), rb.is_empty()) {
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
        _ => a.cmp(b),
    }
}

/// `true` if `a` sorts strictly before `b` in natural order.
pub fn natural_less(a: &str, b: &str) -> bool {
    natural_cmp(a, b) == Ordering::Less
}

/// Sort `items` in natural order of the name returned by `key`.
pub fn sort_natural<T, F>(items: &mut [T], mut key: F)
where
    F: FnMut(&T) -> &str,
{
    items.sort_by(|a, b| natural_cmp(key(a), key(b)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// (a, b, expected ordering of a relative to b)
    const CASES: &[(&str, &str, Ordering)] = &[
        ("a", "b", Ordering::Less),
        ("1", "2", Ordering::Less),
        ("01", "02", Ordering::Less),
        ("01", "01", Ordering::Equal),
        ("image_1", "image_10", Ordering::Less),
        ("image_1a", "image_000001b", Ordering::Less),
        ("image_1b", "image_000001a", Ordering::Greater),
        ("a1", "A2", Ordering::Less),
        ("A1", "a2", Ordering::Less),
        ("A", "a", Ordering::Less),
        ("01", "1", Ordering::Less),
    ];

    #[test]
    fn test_known_pairs() {
        for &(a, b, want) in CASES {
            assert_eq!(
                (natural_less(a, b), natural_less(b, a)),
                (want == Ordering::Less, want == Ordering::Greater),
                "comparing {a:?} to {b:?}, want {want:?}"
            );
        }
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert!(natural_less("page", "page2"));
        assert!(natural_less("ab", "abc"));
        assert!(!natural_less("abc", "ab"));
        assert!(natural_less("", "a"));
    }

    #[test]
    fn test_long_digit_runs_do_not_overflow() {
        let big = "99999999999999999999999999";
        let bigger = "100000000000000000000000000";
        assert!(natural_less(big, bigger));
        assert!(natural_less(&format!("x{big}y"), &format!("x{bigger}a")));
    }

    #[test]
    fn test_non_ascii_case_folding() {
        assert!(natural_less("Ärger_2", "ärger_10"));
        assert!(natural_less("été", "ÉTÉ2"));
    }

    #[test]
    fn test_sort_natural() {
        let mut names = vec!["img10.png", "IMG2.png", "img1.png", "cover.jpg", "img02.png"];
        sort_natural(&mut names, |s| *s);
        assert_eq!(names, ["cover.jpg", "img1.png", "IMG2.png", "img02.png", "img10.png"]);
    }

    fn name() -> impl Strategy<Value = String> {
        "[a-cA-C0-2_]{0,8}"
    }

    proptest! {
        #[test]
        fn test_irreflexive(a in name()) {
            prop_assert!(!natural_less(&a, &a));
        }

        #[test]
        fn test_antisymmetric(a in name(), b in name()) {
            prop_assert_eq!(natural_cmp(&a, &b), natural_cmp(&b, &a).reverse());
            if a != b {
                prop_assert_ne!(natural_cmp(&a, &b), Ordering::Equal);
            }
        }

        #[test]
        fn test_transitive(a in name(), b in name(), c in name()) {
            let mut v = [a, b, c];
            v.sort_by(|x, y| natural_cmp(x, y));
            prop_assert!(natural_cmp(&v[0], &v[1]) != Ordering::Greater);
            prop_assert!(natural_cmp(&v[1], &v[2]) != Ordering::Greater);
            prop_assert!(natural_cmp(&v[0], &v[2]) != Ordering::Greater);
        }
    }
}
