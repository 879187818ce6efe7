//! Import bookkeeping for one generated Go file.

use std::cell::RefCell;
use std::collections::BTreeMap;

use deal_schema::GoIdent;
use tracing::trace;

use crate::compiler::clean_package_name;
use crate::literal::IdentResolver;
use crate::utils::quote;

/// Assigns an alias to every package referenced while generating a file.
///
/// Identifiers declared in the output package itself stay unqualified. Other
/// packages get the last segment of their import path as alias, with a
/// numeric suffix when two paths end the same way.
#[derive(Debug, Default)]
pub struct GoImports {
    local_path: String,
    aliases:    RefCell<BTreeMap<String, String>>,
}

impl GoImports {
    pub fn new(local_path: &str) -> Self {
        GoImports {
            local_path: local_path.to_string(),
            aliases:    RefCell::new(BTreeMap::new()),
        }
    }

    /// Registers `import_path` if needed and returns its alias.
    pub fn import(&self, import_path: &str) -> String {
        if let Some(alias) = self.aliases.borrow().get(import_path) {
            return alias.clone();
        }

        let base = clean_package_name(import_path.rsplit('/').next().unwrap_or(import_path));
        let mut aliases = self.aliases.borrow_mut();
        let mut alias = base.clone();
        let mut suffix = 1;
        while aliases.values().any(|taken| *taken == alias) {
            alias = format!("{}{}", base, suffix);
            suffix += 1;
        }

        trace!(path = import_path, alias = %alias, "registered import");
        aliases.insert(import_path.to_string(), alias.clone());
        alias
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.borrow().is_empty()
    }

    /// `(alias, path)` pairs sorted by path.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.aliases
            .borrow()
            .iter()
            .map(|(path, alias)| (alias.clone(), path.clone()))
            .collect()
    }

    /// Renders the `import ( ... )` block, or nothing when no package was
    /// referenced.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let lines: String = self
            .entries()
            .iter()
            .map(|(alias, path)| format!("\t{} {}\n", alias, quote(path)))
            .collect();
        format!("import (\n{})\n", lines)
    }
}

impl IdentResolver for GoImports {
    fn qualified_name(&self, ident: &GoIdent) -> String {
        if ident.import_path.is_empty() || ident.import_path == self.local_path {
            return ident.go_name.clone();
        }
        format!("{}.{}", self.import(&ident.import_path), ident.go_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_identifiers_stay_unqualified() {
        let imports = GoImports::new("example.com/users");
        assert_eq!(imports.qualified_name(&GoIdent::new("User", "example.com/users")), "User");
        assert_eq!(imports.qualified_name(&GoIdent::new("int32", "")), "int32");
        assert!(imports.is_empty());
        assert_eq!(imports.render(), "");
    }

    #[test]
    fn foreign_identifiers_are_imported_once() {
        let imports = GoImports::new("example.com/mocks");
        assert_eq!(imports.qualified_name(&GoIdent::new("User", "example.com/gen/userspb")), "userspb.User");
        assert_eq!(imports.qualified_name(&GoIdent::new("NaN", "math")), "math.NaN");
        assert_eq!(imports.qualified_name(&GoIdent::new("Role", "example.com/gen/userspb")), "userspb.Role");

        assert_eq!(
            imports.entries(),
            vec![
                ("userspb".to_string(), "example.com/gen/userspb".to_string()),
                ("math".to_string(), "math".to_string()),
            ]
        );
    }

    #[test]
    fn colliding_aliases_get_a_suffix() {
        let imports = GoImports::new("");
        assert_eq!(imports.import("a.com/v1/api"), "api");
        assert_eq!(imports.import("b.com/v2/api"), "api1");
        assert_eq!(imports.import("c.com/api"), "api2");
        assert_eq!(imports.import("a.com/v1/api"), "api");
        assert_eq!(imports.import("example.com/my-api"), "my_api");
    }

    #[test]
    fn renders_sorted_block() {
        let imports = GoImports::new("");
        imports.import("google.golang.org/grpc/status");
        imports.import("context");
        imports.import("google.golang.org/grpc/codes");

        assert_eq!(
            imports.render(),
            "import (\n\
             \tcontext \"context\"\n\
             \tcodes \"google.golang.org/grpc/codes\"\n\
             \tstatus \"google.golang.org/grpc/status\"\n\
             )\n"
        );
    }
}
