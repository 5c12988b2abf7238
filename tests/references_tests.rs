//! End-to-end reference searches over small Go source trees.

#[cfg(test)]
mod tests {
    use refscope::{find_references, Analyzer, AnalyzerConfig, RefError, SearchRequest};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const SHAPE_GO: &str = r#"package shape

type Header struct {
	Name string
}

type Shape interface {
	Draw()
}

func NewShape() Shape {
	return &Triangle{}
}
"#;

    const TRIANGLE_GO: &str = r#"package shape

type Triangle struct{}

type Rectangle struct{}

func (t *Triangle) Draw() {}

func (r *Rectangle) Draw() {}

func useShapes() {
	h := &Header{Name: "1111"}
	_ = h.Name
	t := NewShape()
	_ = t
	tri := &Triangle{}
	tri.Draw()
	rect := &Rectangle{}
	rect.Draw()
}

func first() {
	s := "a"
	_ = s
}

func second() {
	s := "b"
	_ = s
	_ = s + s
}
"#;

    const MAIN_GO: &str = r#"package main

import "pkg/shape"

func main() {
	s := shape.NewShape()
	s.Draw()
	h := shape.Header{Name: "x"}
	_ = h
}
"#;

    /// A GOPATH-style tree under a temporary `src` root.
    struct Fixture {
        _tmp: TempDir,
        root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let base = std::fs::canonicalize(tmp.path()).unwrap();
            let fixture = Fixture {
                _tmp: tmp,
                root: base.join("src"),
            };
            fixture.write("pkg/shape/shape.go", SHAPE_GO);
            fixture.write("pkg/shape/triangle.go", TRIANGLE_GO);
            fixture.write("app/main.go", MAIN_GO);
            fixture
        }

        fn write(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
            path
        }

        fn offset(&self, rel: &str, needle: &str) -> usize {
            let source = std::fs::read_to_string(self.root.join(rel)).unwrap();
            source
                .find(needle)
                .unwrap_or_else(|| panic!("{:?} not in {}", needle, rel))
        }

        fn try_search(
            &self,
            rel: &str,
            needle: &str,
            dir: &str,
            recursive: bool,
        ) -> refscope::Result<Vec<(String, usize, usize)>> {
            self.try_search_at(rel, self.offset(rel, needle), dir, recursive)
        }

        fn try_search_at(
            &self,
            rel: &str,
            offset: usize,
            dir: &str,
            recursive: bool,
        ) -> refscope::Result<Vec<(String, usize, usize)>> {
            let search_root = if dir.is_empty() {
                self.root.clone()
            } else {
                self.root.join(dir)
            };
            let files = refscope::cli::go_files(&search_root, recursive)?;
            self.run(rel, offset, search_root, &files)
        }

        fn run(
            &self,
            rel: &str,
            offset: usize,
            search_root: PathBuf,
            files: &[PathBuf],
        ) -> refscope::Result<Vec<(String, usize, usize)>> {
            let analyzer = Analyzer::new(AnalyzerConfig::with_roots(vec![self.root.clone()]));
            let request = SearchRequest {
                file: self.root.join(rel),
                offset,
                search_root,
            };
            let found = find_references(&analyzer, request, files)?;
            Ok(found
                .into_iter()
                .map(|p| {
                    let rel = p.filename.strip_prefix(&self.root).unwrap();
                    (rel.display().to_string(), p.line, p.column)
                })
                .collect())
        }

        /// Lines found from the occurrence at `offset`, searching `dir`.
        fn search_at(&self, rel: &str, offset: usize, dir: &str) -> Vec<usize> {
            self.try_search_at(rel, offset, dir, false)
                .unwrap()
                .into_iter()
                .map(|(_, line, _)| line)
                .collect()
        }

        fn search(&self, rel: &str, needle: &str, dir: &str, recursive: bool) -> Vec<(String, usize)> {
            self.try_search(rel, needle, dir, recursive)
                .unwrap()
                .into_iter()
                .map(|(file, line, _)| (file, line))
                .collect()
        }
    }

    fn at(file: &str, line: usize) -> (String, usize) {
        (file.to_string(), line)
    }

    #[test]
    fn test_field_declaration_finds_composite_literal_key() {
        let fx = Fixture::new();
        let found = fx.search("pkg/shape/shape.go", "Name string", "pkg/shape", false);
        assert_eq!(
            found,
            vec![
                at("pkg/shape/shape.go", 4),
                at("pkg/shape/triangle.go", 12),
                at("pkg/shape/triangle.go", 13),
            ]
        );
    }

    #[test]
    fn test_package_function_matches_across_files() {
        let fx = Fixture::new();
        let found = fx.search("pkg/shape/triangle.go", "NewShape()", "pkg/shape", false);
        assert_eq!(
            found,
            vec![at("pkg/shape/shape.go", 11), at("pkg/shape/triangle.go", 14)]
        );
    }

    #[test]
    fn test_method_on_other_receiver_is_not_matched() {
        let fx = Fixture::new();
        let found = fx.search("pkg/shape/triangle.go", "Draw() {}", "pkg/shape", false);
        assert_eq!(
            found,
            vec![at("pkg/shape/triangle.go", 7), at("pkg/shape/triangle.go", 17)]
        );
    }

    #[test]
    fn test_same_named_locals_are_told_apart() {
        let fx = Fixture::new();
        let found = fx.search("pkg/shape/triangle.go", "s := \"a\"", "pkg/shape", false);
        assert_eq!(
            found,
            vec![at("pkg/shape/triangle.go", 23), at("pkg/shape/triangle.go", 24)]
        );

        let found = fx
            .try_search("pkg/shape/triangle.go", "s := \"b\"", "pkg/shape", false)
            .unwrap();
        let columns: Vec<_> = found.iter().map(|(_, line, col)| (*line, *col)).collect();
        assert_eq!(columns, vec![(28, 2), (29, 6), (30, 6), (30, 10)]);
    }

    #[test]
    fn test_qualified_call_found_from_importing_package() {
        let fx = Fixture::new();
        let found = fx.search("app/main.go", "NewShape()", "", true);
        assert_eq!(
            found,
            vec![
                at("pkg/shape/shape.go", 11),
                at("app/main.go", 6),
                at("pkg/shape/triangle.go", 14),
            ]
        );
    }

    #[test]
    fn test_field_found_through_qualified_literal() {
        let fx = Fixture::new();
        let found = fx.search("pkg/shape/shape.go", "Name string", "", true);
        assert_eq!(
            found,
            vec![
                at("pkg/shape/shape.go", 4),
                at("app/main.go", 8),
                at("pkg/shape/triangle.go", 12),
                at("pkg/shape/triangle.go", 13),
            ]
        );
    }

    #[test]
    fn test_results_are_deterministic() {
        let fx = Fixture::new();
        let once = fx.search("pkg/shape/shape.go", "Name string", "", true);
        let twice = fx.search("pkg/shape/shape.go", "Name string", "", true);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_elided_literals_in_slices_and_maps() {
        let fx = Fixture::new();
        fx.write(
            "pkg/shape/lists.go",
            r#"package shape

var headers = []Header{{Name: "a"}, {Name: "b"}}

var byKey = map[string]*Header{"k": {Name: "c"}}
"#,
        );
        let found = fx.search("pkg/shape/shape.go", "Name string", "pkg/shape", false);
        assert_eq!(
            found,
            vec![
                at("pkg/shape/shape.go", 4),
                at("pkg/shape/lists.go", 3),
                at("pkg/shape/lists.go", 3),
                at("pkg/shape/lists.go", 5),
                at("pkg/shape/triangle.go", 12),
                at("pkg/shape/triangle.go", 13),
            ]
        );
    }

    const ERRS_GO: &str = r#"package shape

func load() (int, error) { return 0, nil }

func twice() error {
	a, err := load()
	b, err := load()
	_ = a + b
	return err
}

func reuse(err error) error {
	n, err := load()
	_ = n
	return err
}
"#;

    #[test]
    fn test_short_var_redeclaration_reuses_variable() {
        let fx = Fixture::new();
        fx.write("pkg/shape/errs.go", ERRS_GO);
        let rel = "pkg/shape/errs.go";
        let first = ERRS_GO.find("err := load()").unwrap();
        let second = ERRS_GO.find("b, err").unwrap() + 3;
        let last = ERRS_GO.find("return err").unwrap() + 7;
        for offset in [first, second, last] {
            assert_eq!(fx.search_at(rel, offset, "pkg/shape"), vec![6, 7, 9]);
        }
    }

    #[test]
    fn test_short_var_redeclaration_reuses_parameter() {
        let fx = Fixture::new();
        fx.write("pkg/shape/errs.go", ERRS_GO);
        let rel = "pkg/shape/errs.go";
        let param = ERRS_GO.find("err error").unwrap();
        let redeclared = ERRS_GO.find("n, err").unwrap() + 3;
        for offset in [param, redeclared] {
            assert_eq!(fx.search_at(rel, offset, "pkg/shape"), vec![12, 13, 15]);
        }
    }

    #[test]
    fn test_local_shadowing_package_function_is_not_reported() {
        let fx = Fixture::new();
        fx.write(
            "pkg/shape/shadow.go",
            "package shape\n\nfunc other() {\n\tNewShape := 1\n\t_ = NewShape\n}\n",
        );
        // From the call: the declaration is reported first.
        assert_eq!(
            fx.search("app/main.go", "NewShape()", "", true),
            vec![
                at("pkg/shape/shape.go", 11),
                at("app/main.go", 6),
                at("pkg/shape/triangle.go", 14),
            ]
        );
        // From the declaration: same set, in walk order.
        assert_eq!(
            fx.search("pkg/shape/shape.go", "NewShape()", "", true),
            vec![
                at("app/main.go", 6),
                at("pkg/shape/shape.go", 11),
                at("pkg/shape/triangle.go", 14),
            ]
        );
    }

    const PUMP_GO: &str = r#"package shape

func pump(ch chan Header, done chan bool) {
	select {
	case h := <-ch:
		_ = h.Name
	case ok := <-done:
		_ = ok
	}
}
"#;

    #[test]
    fn test_select_receive_binds_variables() {
        let fx = Fixture::new();
        fx.write("pkg/shape/pump.go", PUMP_GO);
        let rel = "pkg/shape/pump.go";
        assert_eq!(fx.search_at(rel, PUMP_GO.find("h := <-ch").unwrap(), "pkg/shape"), vec![5, 6]);
        assert_eq!(fx.search_at(rel, PUMP_GO.find("ok := <-done").unwrap(), "pkg/shape"), vec![7, 8]);

        let found = fx.search("pkg/shape/shape.go", "Name string", "pkg/shape", false);
        assert_eq!(
            found,
            vec![
                at("pkg/shape/shape.go", 4),
                at("pkg/shape/pump.go", 6),
                at("pkg/shape/triangle.go", 12),
                at("pkg/shape/triangle.go", 13),
            ]
        );
    }

    #[test]
    fn test_files_are_walked_in_supplied_order() {
        let fx = Fixture::new();
        let lib = fx.write("lib/lib.go", "package lib\n\nfunc Hit() {}\n");
        let m = fx.write("lib/m.go", "package lib\n\nfunc m() {\n\tHit()\n}\n");
        let y = fx.write(
            "lib/n/y.go",
            "package n\n\nimport \"lib\"\n\nfunc y() {\n\tlib.Hit()\n}\n",
        );
        let z = fx.write("lib/z.go", "package lib\n\nfunc z() {\n\tHit()\n}\n");

        let offset = fx.offset("lib/lib.go", "Hit()");
        let found = fx
            .run("lib/lib.go", offset, fx.root.join("lib"), &[lib, m, y, z])
            .unwrap();
        let order: Vec<_> = found.iter().map(|(file, line, _)| (file.as_str(), *line)).collect();
        assert_eq!(
            order,
            vec![("lib/lib.go", 3), ("lib/m.go", 4), ("lib/n/y.go", 6), ("lib/z.go", 4)]
        );
    }

    #[test]
    fn test_dot_import_skips_only_that_file() {
        let fx = Fixture::new();
        fx.write(
            "app/dots.go",
            "package main\n\nimport . \"pkg/shape\"\n\nfunc other() {\n\t_ = NewShape()\n}\n",
        );
        let found = fx.search("app/main.go", "NewShape()", "app", false);
        assert_eq!(
            found,
            vec![at("app/main.go", 6)]
        );
    }

    #[test]
    fn test_unparsable_file_in_search_set_is_skipped() {
        let fx = Fixture::new();
        fx.write("pkg/shape/broken.go", "package shape\n\nfunc broken( {\n");
        let found = fx.search("pkg/shape/triangle.go", "NewShape()", "pkg/shape", false);
        assert_eq!(
            found,
            vec![at("pkg/shape/shape.go", 11), at("pkg/shape/triangle.go", 14)]
        );
    }

    #[test]
    fn test_unknown_identifier_is_an_error() {
        let fx = Fixture::new();
        fx.write(
            "pkg/shape/missing.go",
            "package shape\n\nfunc missing() {\n\t_ = nowhere\n}\n",
        );
        let err = fx
            .try_search("pkg/shape/missing.go", "nowhere", "pkg/shape", false)
            .unwrap_err();
        assert!(matches!(err, RefError::UnresolvedIdentifier { ref name, .. } if name == "nowhere"));
    }

    #[test]
    fn test_offset_off_identifier_is_an_error() {
        let fx = Fixture::new();
        let err = fx
            .try_search("pkg/shape/shape.go", "package", "pkg/shape", false)
            .unwrap_err();
        assert!(matches!(err, RefError::NoIdentifierAtOffset { .. }));
    }

    #[test]
    fn test_missing_target_file_is_io_error() {
        let fx = Fixture::new();
        let analyzer = Analyzer::new(AnalyzerConfig::default());
        let request = SearchRequest {
            file: fx.root.join("nope.go"),
            offset: 0,
            search_root: fx.root.clone(),
        };
        let err = find_references(&analyzer, request, &[]).unwrap_err();
        assert!(matches!(err, RefError::Io { ref path, .. } if path == Path::new(&fx.root.join("nope.go"))));
    }
}
