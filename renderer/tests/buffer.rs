use renderer::{BufferChain, FlattenError};

#[test]
fn new_chain_is_empty() {
    let chain = BufferChain::new();
    assert_eq!(chain.len(), 0);
    assert!(chain.is_empty());
    assert_eq!(chain.chunk_count(), 0);
    assert!(chain.flatten_bytes().is_empty());
    assert_eq!(chain.flatten_string().unwrap(), "");
}

#[test]
fn flatten_matches_manual_concatenation() {
    let inputs: [&[u8]; 5] = [b"<html>", b"", b"\xff\x00binary", b"text", b"</html>"];
    let mut chain = BufferChain::new();
    let mut expected = Vec::new();
    for input in inputs {
        chain.append(input);
        expected.extend_from_slice(input);
    }
    assert_eq!(chain.len(), expected.len());
    assert_eq!(chain.flatten_bytes(), expected);
    // Empty appends are not stored.
    assert_eq!(chain.chunk_count(), 4);
}

#[test]
fn append_string_counts_bytes() {
    let mut chain = BufferChain::new();
    chain.append_str("grüße");
    assert_eq!(chain.len(), "grüße".len());
    chain.append_owned(b" und tschuess".to_vec());
    assert_eq!(chain.flatten_string().unwrap(), "grüße und tschuess");
}

#[test]
fn append_chain_drains_the_other_chain() {
    let mut a = BufferChain::from("one ");
    a.append_str("two ");
    let mut b = BufferChain::from("three ");
    b.append_str("four");

    a.append_chain(&mut b);

    assert_eq!(a.flatten_string().unwrap(), "one two three four");
    assert_eq!(a.len(), 18);
    assert_eq!(a.chunk_count(), 4);
    assert_eq!(b.len(), 0);
    assert_eq!(b.chunk_count(), 0);
    assert!(b.is_empty());
}

#[test]
fn head_and_tail_removal_keep_size() {
    let mut chain = BufferChain::new();
    chain.append_str("ab");
    chain.append_str("cde");
    chain.append_str("f");

    assert_eq!(chain.front(), Some(&b"ab"[..]));
    assert_eq!(chain.back(), Some(&b"f"[..]));

    assert_eq!(chain.pop_front().as_deref(), Some(&b"ab"[..]));
    assert_eq!(chain.len(), 4);
    assert_eq!(chain.pop_back().as_deref(), Some(&b"f"[..]));
    assert_eq!(chain.len(), 3);
    assert_eq!(chain.flatten_bytes(), b"cde");

    assert!(chain.pop_back().is_some());
    assert!(chain.pop_back().is_none());
    assert!(chain.pop_front().is_none());
    assert_eq!(chain.len(), 0);
}

#[test]
fn string_flattening_rejects_embedded_nul() {
    let mut chain = BufferChain::from("abc");
    chain.append(b"d\0e");
    assert_eq!(
        chain.flatten_string(),
        Err(FlattenError::EmbeddedNul { offset: 4 })
    );
    // Binary flattening keeps everything.
    assert_eq!(chain.flatten_bytes(), b"abcd\0e");
}

#[test]
fn string_flattening_rejects_invalid_utf8() {
    let mut chain = BufferChain::from("ok");
    chain.append(b"\xc3");
    assert_eq!(
        chain.flatten_string(),
        Err(FlattenError::InvalidUtf8 { offset: 2 })
    );
}

#[test]
fn write_to_emits_all_chunks() {
    let mut chain = BufferChain::from("Status: 200\r\n");
    chain.append_str("\r\n");
    chain.append_str("body");
    let mut sink = Vec::new();
    let written = chain.write_to(&mut sink).unwrap();
    assert_eq!(written, chain.len());
    assert_eq!(sink, b"Status: 200\r\n\r\nbody");
}

#[test]
fn chunks_iterate_in_order() {
    let mut chain = BufferChain::new();
    chain.extend([b"x".to_vec(), b"yy".to_vec(), Vec::new(), b"zzz".to_vec()]);
    let chunks: Vec<&[u8]> = chain.chunks().collect();
    assert_eq!(chunks, vec![&b"x"[..], &b"yy"[..], &b"zzz"[..]]);
}
