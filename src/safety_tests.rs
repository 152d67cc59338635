//! Safety gate tests.
//!
//! Every input the compiler cannot translate faithfully must fail with a
//! located diagnostic, the same diagnostic every time, and nothing partial.

#[cfg(test)]
mod tests {
    use crate::{
        compile, compile_to_string, CompileError, CompileOptions, ERR_EFFECT_CALLBACK,
        ERR_EFFECT_CLEANUP, ERR_EFFECT_PLACEMENT, ERR_MARKUP_IN_BRANCH,
        ERR_MARKUP_IN_FOREIGN_FUNCTION, ERR_MARKUP_IN_LOOP, ERR_MEMO_ARGUMENT, ERR_PARSE,
        ERR_REDUCER, ERR_STATE_SHAPE,
    };

    fn fail(src: &str) -> CompileError {
        compile_to_string(src).unwrap_err()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // MARKUP PLACEMENT
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_markup_in_if_inside_component() {
        let err = fail(
            r#"
            import React from 'react';

            export default ({ age, maxAge }) => {
              let allowed;

              if (age > maxAge) {
                allowed = <h3>NOT ALLOWED</h3>;
              } else {
                allowed = <h3>ALLOWED</h3>;
              }

              return <div>{allowed}</div>;
            };
            "#,
        );
        assert!(err.is_structural());
        assert_eq!(err.code(), ERR_MARKUP_IN_BRANCH);
        assert_eq!(err.message(), "JSX inside conditionals cannot be compiled");
    }

    #[test]
    fn test_markup_in_if_outside_component() {
        let err = fail(
            r#"
            import React from 'react';

            if (age > maxAge) {
              allowed = <h3>NOT ALLOWED</h3>;
            }

            export default ({ age, maxAge }) => {
              let allowed;
              return <div>{allowed}</div>;
            };
            "#,
        );
        assert_eq!(err.code(), ERR_MARKUP_IN_BRANCH);
    }

    #[test]
    fn test_markup_in_loops() {
        let inside = fail(
            r#"
            export default () => {
              let jsxElements = [];
              for (let i = 0; i <= 100; i++) {
                jsxElements.push(<div>{i}</div>);
              }
              return <div>{jsxElements}</div>;
            };
            "#,
        );
        assert_eq!(inside.code(), ERR_MARKUP_IN_LOOP);
        assert_eq!(inside.message(), "JSX inside loops cannot be compiled");

        let outside = fail(
            r#"
            for (let i = 0; i <= 100; i++) {
              jsxElements.push(<div>{i}</div>);
            }
            export default () => {
              let jsxElements = [];
              return <div>{jsxElements}</div>;
            };
            "#,
        );
        assert_eq!(outside.code(), ERR_MARKUP_IN_LOOP);
    }

    #[test]
    fn test_markup_in_helper_function() {
        let err = fail(
            "function Row({ v }) { return <li>{v}</li>; }\nexport default () => <ul><Row v={1} /></ul>;",
        );
        assert_eq!(err.code(), ERR_MARKUP_IN_FOREIGN_FUNCTION);

        let err = fail(
            "export default () => { const render = () => <b>x</b>; return <div>{render()}</div>; };",
        );
        assert_eq!(err.code(), ERR_MARKUP_IN_FOREIGN_FUNCTION);
    }

    #[test]
    fn test_markup_in_plain_ternary_statement() {
        let err = fail(
            "export default ({ ok }) => { const view = ok ? <b>yes</b> : <i>no</i>; return <div>{view}</div>; };",
        );
        assert_eq!(err.code(), ERR_MARKUP_IN_BRANCH);
    }

    #[test]
    fn test_map_callbacks_and_logical_and_are_allowed() {
        compile_to_string(
            "export default ({ xs, ok }) => <ul>{xs.map(x => <li key={x}>{x}</li>)}{ok && <li>end</li>}</ul>;",
        )
        .unwrap();
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // HOOKS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_effect_requires_inline_function() {
        let err = fail(
            "export default () => { const run = () => {}; useEffect(run, []); return <div>x</div>; };",
        );
        assert!(err.is_structural());
        assert_eq!(err.code(), ERR_EFFECT_CALLBACK);
        assert_eq!(
            err.message(),
            "The first argument passed to useEffect must be a function expression."
        );
    }

    #[test]
    fn test_effect_cleanup_must_be_a_function() {
        let err = fail("export default () => { useEffect(() => { return 5; }); return <div>x</div>; };");
        assert_eq!(err.code(), ERR_EFFECT_CLEANUP);
        assert_eq!(err.message(), "Cleanup function must be returned as a function expression.");
    }

    #[test]
    fn test_nested_effect_is_rejected() {
        let err = fail(
            "export default () => { function later() { useEffect(() => {}); } return <div>x</div>; };",
        );
        assert_eq!(err.code(), ERR_EFFECT_PLACEMENT);
    }

    #[test]
    fn test_unsupported_hooks() {
        let err = fail(
            "export default () => { const [s, dispatch] = useReducer(reducer, 0); return <div>{s}</div>; };",
        );
        assert!(err.is_unsupported());
        assert_eq!(err.code(), ERR_REDUCER);
        assert_eq!(err.message(), "useReducer is not supported yet");

        let err = fail(
            "export default () => { const v = useMemo(compute, []); return <div>{v}</div>; };",
        );
        assert!(err.is_unsupported());
        assert_eq!(err.code(), ERR_MEMO_ARGUMENT);

        let err = fail("export default () => { const pair = useState(0); return <div>{pair[0]}</div>; };");
        assert!(err.is_unsupported());
        assert_eq!(err.code(), ERR_STATE_SHAPE);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // DIAGNOSTICS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_parse_errors() {
        let err = fail("export default () => <div>;");
        assert!(matches!(err, CompileError::Parse(_)));
        assert_eq!(err.code(), ERR_PARSE);
    }

    #[test]
    fn test_diagnostic_is_located_with_frame() {
        let src = "export default () => {\n  const items = [];\n  while (items.length < 3) {\n    items.push(<li>x</li>);\n  }\n  return <ul>{items}</ul>;\n};";
        let options = CompileOptions {
            filename: Some("List.jsx".to_string()),
            ..CompileOptions::default()
        };
        let err = compile(src, &options).unwrap_err();
        let diagnostic = err.diagnostic();
        assert_eq!(diagnostic.line, 4);
        assert_eq!(diagnostic.column, 16);
        assert_eq!(diagnostic.file.as_deref(), Some("List.jsx"));
        let frame = diagnostic.frame.as_deref().unwrap();
        assert!(frame.contains(">"));
        assert!(frame.contains("JSX inside loops cannot be compiled"));
        assert!(err.to_string().contains("List.jsx:4:16"));
    }

    #[test]
    fn test_frames_can_be_disabled() {
        let options = CompileOptions {
            code_frames: false,
            ..CompileOptions::default()
        };
        let err = compile(
            "export default () => { for (;;) { <i/>; } return <b/>; };",
            &options,
        )
        .unwrap_err();
        assert!(err.diagnostic().frame.is_none());
        assert_eq!(err.diagnostic().line, 1);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // DETERMINISM
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_first_failing_pass_wins() {
        let err = fail(
            "export default () => { const [s, d] = useReducer(r, 0); for (;;) { <i/>; } return <b/>; };",
        );
        assert_eq!(err.code(), ERR_MARKUP_IN_LOOP);
    }

    #[test]
    fn test_repeated_compiles_agree() {
        let bad = "export default () => { if (x) { <i/>; } return <b/>; };";
        assert_eq!(fail(bad), fail(bad));

        let good = "export default ({ a }) => { const [n, setN] = useState(a); const d = n * 2; return <p onClick={setN}>{d}</p>; };";
        let first = compile(good, &CompileOptions::default()).unwrap();
        let second = compile(good, &CompileOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_compiles_share_no_state() {
        let with_state =
            "export default () => { const [v, setV] = useState(0); return <b onClick={setV}>{v}</b>; };";
        let plain = "export default () => <b>plain</b>;";
        compile_to_string(with_state).unwrap();
        let result = compile(plain, &CompileOptions::default()).unwrap();
        assert!(result.synthesized_setters.is_empty());
        assert!(result.state.is_empty());
        assert_eq!(result.code, "<script>\n</script>\n\n<b>plain</b>");
    }
}
