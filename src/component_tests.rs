//! End-to-end tests for props, state cells and hooks.

#[cfg(test)]
mod tests {
    use crate::{compile, compile_to_string, CompileOptions};

    fn squash(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn svelte(src: &str) -> String {
        compile_to_string(src).unwrap()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PROPS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_destructured_props_are_exported_and_reactive() {
        let code = svelte(
            r#"
            import React from 'react';

            export default ({ comment, date }) => {
              const title = `Title: ${comment}`;

              const randomVar = 'hello';

              return <div>testing props</div>;
            };
            "#,
        );
        assert!(code.contains("export let comment;"));
        assert!(code.contains("export let date;"));
        assert!(code.contains("$: title = `Title: ${comment}`"));
        assert!(code.contains("const randomVar = 'hello'"));
        assert!(!code.contains("$: randomVar"));
    }

    #[test]
    fn test_component_without_params_compiles() {
        let code = svelte(
            "import React from 'react';\nexport default () => { const randomVar = 'hello'; return <div>no prop params</div>; };",
        );
        assert!(!code.contains("export let"));
        assert!(code.contains("<div>no prop params</div>"));
    }

    #[test]
    fn test_prop_defaults_and_aliases() {
        let result = compile(
            "export default ({ size = 10, title: heading }) => { const big = size > 5; return <h1>{heading}</h1>; };",
            &CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(result.props, vec!["size", "title"]);
        assert!(result.code.contains("export let size = 10;"));
        assert!(result.code.contains("export let title;"));
        assert!(result.code.contains("$: heading = title;"));
        assert!(result.code.contains("$: big = size > 5;"));
    }

    #[test]
    fn test_whole_props_object() {
        let result = compile(
            "export default (props) => { const shout = props.label.toUpperCase(); return <p title={props.hint}>{shout}</p>; };",
            &CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(result.props, vec!["label", "hint"]);
        assert!(result.code.contains("$: shout = $$props.label.toUpperCase();"));
        assert!(result.markup.contains("$$props.hint"));
    }

    #[test]
    fn test_each_prop_is_exported_exactly_once() {
        let code = svelte(
            "export default ({ a, b }) => { const x = a + a; const y = b + a; return <p>{a}{b}</p>; };",
        );
        assert_eq!(code.matches("export let a;").count(), 1);
        assert_eq!(code.matches("export let b;").count(), 1);
        assert_eq!(code.matches("export let").count(), 2);
    }

    #[test]
    fn test_reactive_chain_is_labeled_once() {
        let code = svelte(
            "export default ({ n }) => { const double = n * 2; const quad = double * 2; console.log(quad); return <p>{quad}</p>; };",
        );
        assert_eq!(code.matches("$: double = n * 2;").count(), 1);
        assert_eq!(code.matches("$: quad = double * 2;").count(), 1);
        assert!(code.contains("$: console.log(quad);"));
        assert!(!code.contains("$: $:"));
    }

    #[test]
    fn test_prop_used_only_in_markup_adds_no_label() {
        let code = svelte("export default ({ name }) => { const greeting = 'hi'; return <p>{greeting} {name}</p>; };");
        assert!(!code.contains("$:"));
        assert!(code.contains("export let name;"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // STATE
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_state_declarations_and_dependents() {
        let code = svelte(
            r#"
            import React, { useState } from 'react';

            export default () => {
              const [state1, setState1] = useState('gears of war 4');
              const [state2, setState2] = useState(null);

              const dependentOnState1 = state1 + 'bla';
              const dependentOnBoth = state1 + 'bla' + state2;
              const anotherVar = 'bla bla';

              return <div>testing useState</div>;
            };
            "#,
        );
        assert!(code.contains("let state1 = 'gears of war 4'"));
        assert!(code.contains("let state2 = null"));
        assert!(!code.contains("useState("));
        assert!(code.contains("$: dependentOnState1 = state1 + 'bla'"));
        assert!(code.contains("$: dependentOnBoth = state1 + 'bla' + state2"));
        assert!(!code.contains("const dependentOnState1"));
        assert!(code.contains("const anotherVar = 'bla bla'"));
        assert!(!code.contains("$: anotherVar"));
        assert!(!code.contains("$: let state1"));
    }

    #[test]
    fn test_setter_calls_and_synthesized_setter() {
        let result = compile(
            r#"
            import React, { useState, Fragment } from 'react';

            export default () => {
              const [state1, setState1] = useState('gears of war 4');
              const [state2, setState2] = useState(null);

              function handleClick(e) {
                setState2('hello');
              }

              return (
                <Fragment>
                  <button onClick={handleClick}>set value</button>
                  <button onClick={() => setState1('world')}>set value</button>
                  <button onClick={setState1}>set value</button>
                </Fragment>
              )
            };
            "#,
            &CompileOptions::default(),
        )
        .unwrap();
        let code = &result.code;
        assert!(code.contains("state2 = 'hello'"));
        assert!(!code.contains("setState2('hello')"));
        assert!(code.contains("() => state1 = 'world'"));
        assert!(!code.contains("setState1('world')"));
        assert!(squash(code).contains(&squash("function setState1(value) { state1 = value; }")));
        assert_eq!(result.synthesized_setters, vec!["setState1"]);
        assert!(code.contains("on:click={setState1}"));
        assert!(!code.contains("Fragment"));
    }

    #[test]
    fn test_updater_function_receives_current_value() {
        let code = svelte(
            "export default () => { const [count, setCount] = useState(0); const inc = () => setCount(c => c + 1); return <button onClick={inc}>{count}</button>; };",
        );
        assert!(squash(&code).contains("count=((c)=>c+1)(count)") || squash(&code).contains("count=(c=>c+1)(count)"));
        assert!(!code.contains("setCount"));
    }

    #[test]
    fn test_synthesized_setter_is_emitted_once_and_last() {
        let result = compile(
            "export default () => { const [v, setV] = useState(1); const a = setV; const b = setV; return <p onClick={setV}>{v}</p>; };",
            &CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(result.code.matches("function setV(").count(), 1);
        assert!(result.script.last().unwrap().starts_with("function setV(value)"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // HOOKS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_use_callback_is_replaced_by_its_function() {
        let code = svelte(
            r#"
            import React from 'react';

            export default ({ prop }) => {
              const randomCb = useCallback(() => 'hello', [prop]);
              const randomCb2 = useCallback(() => 'hello2', []);
              const randomCb3 = useCallback(() => 'hello3');

              return <div>testing props</div>;
            };
            "#,
        );
        assert!(code.contains("const randomCb = () => 'hello'"));
        assert!(code.contains("const randomCb2 = () => 'hello2'"));
        assert!(code.contains("const randomCb3 = () => 'hello3'"));
        assert!(!code.contains("useCallback"));
    }

    #[test]
    fn test_mount_effect() {
        let code = svelte(
            "import React from 'react';\nexport default ({ prop }) => { useEffect(() => { doSomething(); }, []); return <div>testing props</div>; };",
        );
        assert!(code.contains("import { onMount } from \"svelte\";"));
        assert!(squash(&code).contains(&squash("onMount(() => { doSomething(); })")));
        assert!(!code.contains("useEffect"));
    }

    #[test]
    fn test_update_effects() {
        let result = compile(
            "export default ({ prop }) => { useEffect(() => { doSomething(); }, [prop]); useEffect(() => { doSomethingElse(); }); return <div>testing afterUpdate</div>; };",
            &CompileOptions::default(),
        )
        .unwrap();
        assert!(result.code.contains("import { afterUpdate } from \"svelte\";"));
        assert!(squash(&result.code).contains(&squash("afterUpdate(() => { doSomething(); })")));
        assert!(squash(&result.code).contains(&squash("afterUpdate(() => { doSomethingElse(); })")));
        assert!(!result.code.contains("[prop]"));
        assert_eq!(result.lifecycle_imports, vec!["afterUpdate"]);
    }

    #[test]
    fn test_effect_cleanup_and_combined_import() {
        let result = compile(
            "export default () => { useEffect(() => { const id = setInterval(tick, 1000); return () => clearInterval(id); }, []); return <div/>; };",
            &CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(result.script[0], "import { onMount, onDestroy } from \"svelte\";");
        let mount = result.script.iter().position(|s| s.starts_with("onMount(")).unwrap();
        assert!(result.script[mount + 1].starts_with("onDestroy(() => clearInterval(id))"));
        assert!(!result.script[mount].contains("return"));
    }

    #[test]
    fn test_use_memo_becomes_reactive_value() {
        let code = svelte(
            "export default ({ items }) => { const total = useMemo(() => items.length * 2, [items]); return <p>{total}</p>; };",
        );
        assert!(code.contains("$: total = items.length * 2;"));
        assert!(!code.contains("useMemo"));
    }
}
