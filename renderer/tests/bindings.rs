use renderer::{Bindings, Loop};

#[test]
fn set_overwrites_previous_value() {
    let mut b = Bindings::new();
    b.set("name", "first");
    b.set("name", "second");
    assert_eq!(b.get_str("name"), Some("second"));
    b.set("name", "");
    assert_eq!(b.get("name"), Some(&b""[..]));
}

#[test]
fn byte_values_keep_embedded_nul() {
    let mut b = Bindings::new();
    b.set_bytes("raw", b"a\0b");
    assert_eq!(b.get("raw"), Some(&b"a\0b"[..]));
    b.set_owned("moved", vec![0xff, 0x00]);
    assert_eq!(b.get("moved"), Some(&[0xffu8, 0x00][..]));
    assert_eq!(b.get_str("moved"), None);
}

#[test]
fn add_loop_is_idempotent_by_name() {
    let mut b = Bindings::new();
    b.add_loop("items").push_new().set("n", "1");
    b.add_loop("items").push_new().set("n", "2");
    let items = b.get_loop("items").expect("loop missing");
    assert_eq!(items.len(), 2);
    let values: Vec<&str> = items.iter().filter_map(|c| c.get_str("n")).collect();
    assert_eq!(values, vec!["1", "2"]);
}

#[test]
fn scalars_and_loops_are_separate_namespaces() {
    let mut b = Bindings::new();
    b.set("x", "scalar");
    b.add_loop("x").add(Bindings::new());
    assert_eq!(b.get_str("x"), Some("scalar"));
    assert_eq!(b.get_loop("x").map(Loop::len), Some(1));
    b.remove("x");
    assert!(b.get("x").is_none());
    assert!(b.get_loop("x").is_some());
}

#[test]
fn condition_rules() {
    let mut b = Bindings::new();
    assert!(!b.condition("missing"));
    b.set("zero", "0");
    b.set("empty", "");
    b.set("one", "1");
    b.set("spaces", " ");
    assert!(!b.condition("zero"));
    assert!(!b.condition("empty"));
    assert!(b.condition("one"));
    assert!(b.condition("spaces"));

    b.add_loop("none");
    assert!(!b.condition("none"));
    let items: Loop = vec![Bindings::new()].into_iter().collect();
    *b.add_loop("some") = items;
    assert!(b.condition("some"));
}
