//! Tests for structural patch generation and application.

#[cfg(test)]
mod tests {
    use crate::patch::{
        apply_structural_patch, create_structural_patch, merge_patch_values,
        structural_patch_values,
    };
    use crate::schema::{Parser, PatchMeta};
    use crate::value::{from_yaml, Value};
    use pretty_assertions::assert_eq;

    const POD_SCHEMA: &str = r#"types:
- name: pod
  map:
    elementType:
      namedType: __untyped_atomic_
    fields:
    - name: containers
      type:
        list:
          elementType:
            namedType: container
          elementRelationship: associative
          keys: [name]
    - name: ports
      type:
        list:
          elementType:
            namedType: port
          elementRelationship: associative
          keys: [port, protocol]
    - name: finalizers
      type:
        list:
          elementType:
            scalar: string
          elementRelationship: associative
    - name: args
      type:
        list:
          elementType:
            scalar: string
          elementRelationship: atomic
    - name: labels
      type:
        map:
          elementType:
            scalar: string
    - name: selector
      type:
        map:
          elementType:
            scalar: string
          elementRelationship: atomic
- name: container
  map:
    elementType:
      namedType: __untyped_atomic_
    fields:
    - name: name
      type:
        scalar: string
    - name: env
      type:
        list:
          elementType:
            namedType: envVar
          elementRelationship: associative
          keys: [name]
- name: envVar
  map:
    elementType:
      namedType: __untyped_atomic_
- name: port
  map:
    elementType:
      namedType: __untyped_atomic_
- name: __untyped_atomic_
  scalar: untyped
  list:
    elementType:
      namedType: __untyped_atomic_
    elementRelationship: atomic
  map:
    elementType:
      namedType: __untyped_atomic_
    elementRelationship: atomic
"#;

    /// One structural patch scenario.
    struct PatchTestCase {
        name: &'static str,
        live: &'static str,
        desired: &'static str,
        original: Option<&'static str>,
        patch: &'static str,
        result: &'static str,
    }

    fn pod_meta() -> PatchMeta {
        Parser::new(POD_SCHEMA)
            .expect("pod schema should parse")
            .patch_meta("pod")
    }

    fn doc(yaml: &str) -> Value {
        from_yaml(yaml).unwrap_or_else(|e| panic!("invalid document {}: {}", yaml, e))
    }

    fn run_patch_test_case(tc: PatchTestCase) {
        let meta = pod_meta();
        let live = doc(tc.live);
        let desired = doc(tc.desired);
        let original = tc.original.map(doc);

        let patch = structural_patch_values(&live, &desired, original.as_ref(), &meta)
            .unwrap_or_else(|e| panic!("{}: patch failed: {}", tc.name, e));
        assert_eq!(patch, doc(tc.patch), "{}: unexpected patch", tc.name);

        let result = apply_structural_patch(&live, &patch, &meta);
        assert_eq!(result, doc(tc.result), "{}: unexpected result", tc.name);

        // The patched object has converged: diffing again yields nothing.
        let again = structural_patch_values(&result, &desired, original.as_ref(), &meta).unwrap();
        assert_eq!(again, doc("{}"), "{}: second patch not empty", tc.name);
    }

    #[test]
    fn test_keyed_list_merges_by_key() {
        run_patch_test_case(PatchTestCase {
            name: "keyed list keeps untouched elements",
            live: "{containers: [{name: x, v: 1}, {name: y, v: 9}]}",
            desired: "{containers: [{name: x, v: 2}]}",
            original: None,
            patch: "{containers: [{name: x, v: 2}]}",
            result: "{containers: [{name: x, v: 2}, {name: y, v: 9}]}",
        });
    }

    #[test]
    fn test_three_way_preserves_foreign_edits() {
        run_patch_test_case(PatchTestCase {
            name: "foreign edit on b survives",
            live: "{a: 1, b: 2}",
            desired: "{a: 2, b: 1}",
            original: Some("{a: 1, b: 1}"),
            patch: "{a: 2}",
            result: "{a: 2, b: 2}",
        });
    }

    #[test]
    fn test_three_way_removes_field_the_caller_dropped() {
        run_patch_test_case(PatchTestCase {
            name: "field dropped from the definition",
            live: "{a: 1, b: 1, c: 5}",
            desired: "{a: 1}",
            original: Some("{a: 1, b: 1}"),
            patch: "{b: null}",
            result: "{a: 1, c: 5}",
        });
    }

    #[test]
    fn test_three_way_deletes_owned_element() {
        run_patch_test_case(PatchTestCase {
            name: "element dropped from the definition",
            live: "{containers: [{name: x, image: a}, {name: y, image: b}, {name: z, image: c}]}",
            desired: "{containers: [{name: x, image: a}]}",
            original: Some("{containers: [{name: x, image: a}, {name: z, image: c}]}"),
            patch: "{containers: [{name: z, $patch: delete}]}",
            result: "{containers: [{name: x, image: a}, {name: y, image: b}]}",
        });
    }

    #[test]
    fn test_three_way_skips_deletion_already_applied() {
        run_patch_test_case(PatchTestCase {
            name: "element already gone",
            live: "{containers: [{name: x, image: a}]}",
            desired: "{containers: [{name: x, image: a}]}",
            original: Some("{containers: [{name: x, image: a}, {name: z, image: c}]}"),
            patch: "{}",
            result: "{containers: [{name: x, image: a}]}",
        });
    }

    #[test]
    fn test_three_way_skips_addition_already_live() {
        run_patch_test_case(PatchTestCase {
            name: "element already added",
            live: "{containers: [{name: x, image: a}, {name: y, image: b}]}",
            desired: "{containers: [{name: x, image: a}, {name: y, image: b}]}",
            original: Some("{containers: [{name: x, image: a}]}"),
            patch: "{}",
            result: "{containers: [{name: x, image: a}, {name: y, image: b}]}",
        });
    }

    #[test]
    fn test_three_way_element_change_keeps_foreign_fields() {
        run_patch_test_case(PatchTestCase {
            name: "element field set by another writer",
            live: "{containers: [{name: x, image: v1, resources: {cpu: 1}}]}",
            desired: "{containers: [{name: x, image: v2}]}",
            original: Some("{containers: [{name: x, image: v1}]}"),
            patch: "{containers: [{name: x, image: v2}]}",
            result: "{containers: [{name: x, image: v2, resources: {cpu: 1}}]}",
        });
    }

    #[test]
    fn test_nested_keyed_lists() {
        run_patch_test_case(PatchTestCase {
            name: "env merged inside a container",
            live: r#"{containers: [{name: x, env: [{name: A, value: "1"}, {name: B, value: "2"}]}]}"#,
            desired: r#"{containers: [{name: x, env: [{name: A, value: "3"}]}]}"#,
            original: None,
            patch: r#"{containers: [{name: x, env: [{name: A, value: "3"}]}]}"#,
            result: r#"{containers: [{name: x, env: [{name: A, value: "3"}, {name: B, value: "2"}]}]}"#,
        });
    }

    #[test]
    fn test_composite_keys() {
        run_patch_test_case(PatchTestCase {
            name: "ports keyed by port and protocol",
            live: "{ports: [{port: 80, protocol: TCP, name: http}, {port: 80, protocol: UDP, name: dns}]}",
            desired: "{ports: [{port: 80, protocol: UDP, name: quic}]}",
            original: None,
            patch: "{ports: [{port: 80, protocol: UDP, name: quic}]}",
            result: "{ports: [{port: 80, protocol: TCP, name: http}, {port: 80, protocol: UDP, name: quic}]}",
        });
    }

    #[test]
    fn test_set_list() {
        run_patch_test_case(PatchTestCase {
            name: "finalizers merged as a set",
            live: "{finalizers: [a, b, d]}",
            desired: "{finalizers: [a, c]}",
            original: Some("{finalizers: [a, b]}"),
            patch: "{finalizers: [c], $deleteFromPrimitiveList/finalizers: [b]}",
            result: "{finalizers: [a, d, c]}",
        });
    }

    #[test]
    fn test_atomic_list_is_replaced() {
        run_patch_test_case(PatchTestCase {
            name: "args replaced wholesale",
            live: "{args: [a, b]}",
            desired: "{args: [c]}",
            original: None,
            patch: "{args: [c]}",
            result: "{args: [c]}",
        });
    }

    #[test]
    fn test_atomic_and_separable_maps() {
        run_patch_test_case(PatchTestCase {
            name: "atomic selector replaced, labels merged",
            live: "{selector: {app: web, tier: front}, labels: {app: web, tier: front}}",
            desired: "{selector: {app: web}, labels: {app: web}}",
            original: None,
            patch: "{selector: {app: web}, labels: {tier: null}}",
            result: "{selector: {app: web}, labels: {app: web}}",
        });
    }

    #[test]
    fn test_two_way_deletes_missing_keys() {
        run_patch_test_case(PatchTestCase {
            name: "key missing from desired",
            live: "{a: 1, c: 3}",
            desired: "{a: 1}",
            original: None,
            patch: "{c: null}",
            result: "{a: 1}",
        });
    }

    #[test]
    fn test_elements_without_keys_are_replaced() {
        run_patch_test_case(PatchTestCase {
            name: "live element has no name",
            live: "{containers: [{v: 1}]}",
            desired: "{containers: [{name: x}]}",
            original: None,
            patch: "{containers: [{name: x}]}",
            result: "{containers: [{name: x}]}",
        });
    }

    #[test]
    fn test_keyless_live_list_gets_full_desired_list() {
        run_patch_test_case(PatchTestCase {
            name: "live element lost its name",
            live: "{containers: [{image: v1}]}",
            desired: "{containers: [{name: x, image: v2, port: 80}]}",
            original: Some("{containers: [{name: x, image: v1, port: 80}]}"),
            patch: "{containers: [{name: x, image: v2, port: 80}]}",
            result: "{containers: [{name: x, image: v2, port: 80}]}",
        });
    }

    #[test]
    fn test_element_removed_from_live_is_added_whole() {
        run_patch_test_case(PatchTestCase {
            name: "element deleted by another writer",
            live: "{containers: [{name: y, image: b}]}",
            desired: "{containers: [{name: x, image: v2, port: 80}]}",
            original: Some("{containers: [{name: x, image: v1, port: 80}]}"),
            patch: "{containers: [{name: x, image: v2, port: 80}]}",
            result: "{containers: [{name: y, image: b}, {name: x, image: v2, port: 80}]}",
        });
    }

    #[test]
    fn test_keyless_nested_live_list_gets_full_desired_list() {
        run_patch_test_case(PatchTestCase {
            name: "env entry without a name",
            live: "{containers: [{name: x, env: [{value: a}]}]}",
            desired: "{containers: [{name: x, env: [{name: A, value: b, from: c}]}]}",
            original: Some("{containers: [{name: x, env: [{name: A, value: a, from: c}]}]}"),
            patch: "{containers: [{name: x, env: [{name: A, value: b, from: c}]}]}",
            result: "{containers: [{name: x, env: [{name: A, value: b, from: c}]}]}",
        });
    }

    #[test]
    fn test_integral_floats_match_ints() {
        run_patch_test_case(PatchTestCase {
            name: "1.0 equals 1",
            live: "{replicas: 1, ports: [{port: 80, protocol: TCP, weight: 2}]}",
            desired: "{replicas: 1.0, ports: [{port: 80.0, protocol: TCP, weight: 2.0}]}",
            original: Some("{replicas: 2, ports: [{port: 80, protocol: TCP, weight: 3}]}"),
            patch: "{}",
            result: "{replicas: 1, ports: [{port: 80, protocol: TCP, weight: 2}]}",
        });
        run_patch_test_case(PatchTestCase {
            name: "1.0 equals 1 without an original",
            live: "{replicas: 1, finalizers: [a]}",
            desired: "{replicas: 1.0, finalizers: [a]}",
            original: None,
            patch: "{}",
            result: "{replicas: 1, finalizers: [a]}",
        });
    }

    #[test]
    fn test_nan_keys_are_not_matched() {
        let meta = pod_meta();
        let live = Value::Map(
            [(
                "ports".to_string(),
                Value::List(vec![Value::Map(
                    [
                        ("port".to_string(), Value::Float(f64::NAN)),
                        ("protocol".to_string(), Value::String("TCP".into())),
                    ]
                    .into_iter()
                    .collect(),
                )]),
            )]
            .into_iter()
            .collect(),
        );
        let desired = doc("{ports: [{port: 80, protocol: TCP}]}");

        // The live list can't be keyed, so the desired list replaces it.
        let patch = structural_patch_values(&live, &desired, None, &meta).unwrap();
        assert_eq!(patch, desired);
        assert_eq!(apply_structural_patch(&live, &patch, &meta), desired);
    }

    #[test]
    fn test_structural_and_merge_diverge_on_lists() {
        let live = doc("{containers: [{name: x, v: 1}, {name: y, v: 9}]}");
        let desired = doc("{containers: [{name: x, v: 2}]}");

        let merge = merge_patch_values(&live, &desired).unwrap();
        let merged = crate::patch::apply_merge_patch(&live, &merge);
        assert_eq!(merged, doc("{containers: [{name: x, v: 2}]}"));

        let meta = pod_meta();
        let structural = structural_patch_values(&live, &desired, None, &meta).unwrap();
        let merged = apply_structural_patch(&live, &structural, &meta);
        assert_eq!(merged, doc("{containers: [{name: x, v: 2}, {name: y, v: 9}]}"));
    }

    #[test]
    fn test_deduced_meta_behaves_like_merge_patch() {
        let live = doc("{spec: {items: [1, 2], labels: {a: x, b: y}}}");
        let desired = doc("{spec: {items: [3], labels: {a: z}}}");

        let structural =
            structural_patch_values(&live, &desired, None, &PatchMeta::deduced()).unwrap();
        assert_eq!(structural, merge_patch_values(&live, &desired).unwrap());
    }

    #[test]
    fn test_bytes_api() {
        let meta = pod_meta();
        let patch = create_structural_patch(
            br#"{"b":2,"a":1}"#,
            br#"{"a":2,"b":1}"#,
            Some(br#"{"a":1,"b":1}"#),
            &meta,
        )
        .unwrap();
        assert_eq!(patch, br#"{"a":2}"#.to_vec());

        let same = create_structural_patch(br#"{"a":1}"#, br#"{"a":1}"#, None, &meta).unwrap();
        assert_eq!(same, b"{}".to_vec());

        assert!(create_structural_patch(b"[]", b"{}", None, &meta).is_err());
    }
}
