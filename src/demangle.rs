//! Collection of mangled/demangled symbol pairs from preserved lines.

use std::sync::LazyLock;

use regex::Regex;

use crate::annotate::Demangling;


/// Demangle a symbol name, trying the Rust scheme first and falling back
/// to the Itanium C++ ABI. Returns `None` when demangling fails or does
/// not change the name.
#[cfg(feature = "demangle")]
fn maybe_demangle(name: &str) -> Option<String> {
    let demangled = rustc_demangle::try_demangle(name)
        .map(|demangled| format!("{demangled:#}"))
        .ok()
        .or_else(|| {
            cpp_demangle::Symbol::new(name)
                .ok()
                .and_then(|symbol| symbol.demangle(&Default::default()).ok())
        })?;
    (demangled != name).then_some(demangled)
}

#[cfg(not(feature = "demangle"))]
fn maybe_demangle(_name: &str) -> Option<String> {
    None
}


/// Scan `line` for mangled symbols and append one pair per occurrence,
/// left to right. Only symbols whose demangled form differs from the
/// mangled one are recorded.
pub(crate) fn collect_into<'input>(line: &'input str, demanglings: &mut Vec<Demangling<'input>>) {
    static MANGLED: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"_Z[A-Za-z0-9_]+").expect("mangled-symbol pattern failed to compile"));

    for found in MANGLED.find_iter(line) {
        let mangled = found.as_str();
        if let Some(demangled) = maybe_demangle(mangled) {
            demanglings.push(Demangling { mangled, demangled });
        }
    }
}


#[cfg(all(test, feature = "demangle"))]
mod tests {
    use super::*;


    /// C++ symbols demangle through the Itanium scheme.
    #[test]
    fn cpp_symbols() {
        let line = "\tcall\t_ZN4math1fEi@PLT";
        let mut demanglings = Vec::new();
        collect_into(line, &mut demanglings);
        assert_eq!(demanglings.len(), 1);
        assert_eq!(demanglings[0].mangled, "_ZN4math1fEi");
        assert!(demanglings[0].demangled.contains("math::f"));
    }

    /// Rust legacy symbols demangle through `rustc-demangle`, hash
    /// stripped.
    #[test]
    fn rust_symbols() {
        let mut demanglings = Vec::new();
        collect_into(
            "\tcall\t_ZN4core3fmt9Arguments6new_v117h3c6f806acbe1ddabE",
            &mut demanglings,
        );
        assert_eq!(demanglings.len(), 1);
        assert_eq!(demanglings[0].demangled, "core::fmt::Arguments::new_v1");
    }

    /// Multiple symbols on one line are recorded left to right.
    #[test]
    fn multiple_per_line() {
        let line = "\t.quad\t_ZN4math1fEi-_ZN4math1gEi";
        let mut demanglings = Vec::new();
        collect_into(line, &mut demanglings);
        let mangled = demanglings.iter().map(|d| d.mangled).collect::<Vec<_>>();
        assert_eq!(mangled, vec!["_ZN4math1fEi", "_ZN4math1gEi"]);
    }

    /// Lines without mangled symbols record nothing; neither do
    /// non-demanglable `_Z` lookalikes.
    #[test]
    fn no_symbols() {
        let mut demanglings = Vec::new();
        collect_into("\tmovl\t$42, %eax", &mut demanglings);
        collect_into("\tcall\t_Znot_a_symbol", &mut demanglings);
        assert!(demanglings.is_empty());
    }
}
