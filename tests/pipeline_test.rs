//! End-to-end pipeline runs over temp files and folders.

use anyhow::Result;

use conduit::engine::build_pipeline;
use conduit::error::ProxyError;

fn tokens(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

#[tokio::test]
async fn length_framed_file_becomes_lines() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    tokio::fs::write(&input, b"\x05\x00\x00\x00hello\x05\x00\x00\x00world").await?;

    let mut pipeline = build_pipeline(&tokens(&[
        &format!("file:{}", input.display()),
        "-length",
        "+lines",
        &format!("file:{}", output.display()),
    ]))?;
    pipeline.run().await?;

    // The line delimiter only appears between messages, never trailing.
    assert_eq!(tokio::fs::read(&output).await?, b"hello\nworld");
    Ok(())
}

#[tokio::test]
async fn lines_fan_out_into_length_framed_folder_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    tokio::fs::create_dir_all(&input).await?;
    tokio::fs::write(input.join("messages"), b"m1\nm2\nm3").await?;

    let mut pipeline = build_pipeline(&tokens(&[
        &format!("folder:{}", input.display()),
        "-lines",
        "+length",
        &format!("folder:{}", output.display()),
    ]))?;
    pipeline.run().await?;

    assert_eq!(
        tokio::fs::read(output.join("000000")).await?,
        b"\x02\x00\x00\x00m1"
    );
    assert_eq!(
        tokio::fs::read(output.join("000001")).await?,
        b"\x02\x00\x00\x00m2"
    );
    assert_eq!(
        tokio::fs::read(output.join("000002")).await?,
        b"\x02\x00\x00\x00m3"
    );
    assert!(!output.join("000003").exists());
    Ok(())
}

#[tokio::test]
async fn url_encoding_end_to_end() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    tokio::fs::write(&input, b"a b&c").await?;

    let mut pipeline = build_pipeline(&tokens(&[
        &format!("file:{}", input.display()),
        "+url",
        &format!("file:{}", output.display()),
    ]))?;
    pipeline.run().await?;

    assert_eq!(tokio::fs::read(&output).await?, b"a%20b%26c");
    Ok(())
}

#[tokio::test]
async fn frame_split_across_source_chunks_is_reassembled() -> Result<()> {
    // Two folder files act as two separate source chunks carrying the halves
    // of one length-framed message.
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    tokio::fs::create_dir_all(&input).await?;
    tokio::fs::write(input.join("a"), b"\x05\x00\x00\x00he").await?;
    tokio::fs::write(input.join("b"), b"llo").await?;

    let mut pipeline = build_pipeline(&tokens(&[
        &format!("folder:{}", input.display()),
        "-length",
        &format!("file:{}", output.display()),
    ]))?;
    pipeline.run().await?;

    assert_eq!(tokio::fs::read(&output).await?, b"hello");
    Ok(())
}

#[tokio::test]
async fn partial_frame_at_end_of_stream_is_dropped_cleanly() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    // Header promises five bytes, only three arrive.
    tokio::fs::write(&input, b"\x05\x00\x00\x00hel").await?;

    let mut pipeline = build_pipeline(&tokens(&[
        &format!("file:{}", input.display()),
        "-length",
        &format!("file:{}", output.display()),
    ]))?;
    pipeline.run().await?;

    // No complete message ever reached the sink, so it never opened its file.
    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn reframing_length_prefixed_stream_to_delimited() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    tokio::fs::write(&input, b"\x05\x00\x00\x00hello\x05\x00\x00\x00world").await?;

    let mut pipeline = build_pipeline(&tokens(&[
        &format!("file:{}", input.display()),
        "-length",
        "+delim:|",
        &format!("file:{}", output.display()),
    ]))?;
    pipeline.run().await?;

    assert_eq!(tokio::fs::read(&output).await?, b"hello|world");
    Ok(())
}

#[tokio::test]
async fn passthrough_stages_do_not_disturb_the_data() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    tokio::fs::write(&input, b"untouched payload").await?;

    let mut pipeline = build_pipeline(&tokens(&[
        &format!("file:{}", input.display()),
        "null",
        "log:TRACE",
        &format!("file:{}", output.display()),
    ]))?;
    pipeline.run().await?;

    assert_eq!(tokio::fs::read(&output).await?, b"untouched payload");
    Ok(())
}

#[tokio::test]
async fn escaped_messages_survive_line_framing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in");
    let middle = dir.path().join("mid");
    let output = dir.path().join("out");
    tokio::fs::create_dir_all(&input).await?;
    tokio::fs::write(input.join("a"), b"first\nmessage").await?;
    tokio::fs::write(input.join("b"), b"second").await?;

    // Escape newlines so each message fits on one line of the middle file.
    let mut encode = build_pipeline(&tokens(&[
        &format!("folder:{}", input.display()),
        "+n",
        "+lines",
        &format!("file:{}", middle.display()),
    ]))?;
    encode.run().await?;
    assert_eq!(
        tokio::fs::read(&middle).await?,
        b"first\\nmessage\nsecond"
    );

    // And back: split lines, unescape, collect into one folder per message.
    let mut decode = build_pipeline(&tokens(&[
        &format!("file:{}", middle.display()),
        "-lines",
        "-n",
        &format!("folder:{}", output.display()),
    ]))?;
    decode.run().await?;

    assert_eq!(
        tokio::fs::read(output.join("000000")).await?,
        b"first\nmessage"
    );
    assert_eq!(tokio::fs::read(output.join("000001")).await?, b"second");
    Ok(())
}

#[tokio::test]
async fn xml_document_becomes_json() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in.xml");
    let output = dir.path().join("out.json");
    tokio::fs::write(&input, b"<root><a>1</a></root>").await?;

    let mut pipeline = build_pipeline(&tokens(&[
        &format!("file:{}", input.display()),
        "strip",
        "xml-json",
        &format!("file:{}", output.display()),
    ]))?;
    pipeline.run().await?;

    let written: serde_json::Value = serde_json::from_slice(&tokio::fs::read(&output).await?)?;
    assert_eq!(written, serde_json::json!({"root": {"a": "1"}}));
    Ok(())
}

#[tokio::test]
async fn corrupt_data_aborts_the_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    tokio::fs::write(&input, b"not json at all").await?;

    let mut pipeline = build_pipeline(&tokens(&[
        &format!("file:{}", input.display()),
        "json-xml",
        &format!("file:{}", output.display()),
    ]))?;
    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, ProxyError::InvalidData(_)));
    Ok(())
}

#[test]
fn startup_rejects_bad_pipelines() {
    assert!(matches!(
        build_pipeline(&tokens(&["file:/tmp/in"])),
        Err(ProxyError::InvalidOption(_))
    ));
    assert!(matches!(
        build_pipeline(&tokens(&["file:/tmp/in", "teleport", "std"])),
        Err(ProxyError::InvalidOption(_))
    ));
    assert!(matches!(
        build_pipeline(&tokens(&["+url", "std"])),
        Err(ProxyError::InvalidOption(_))
    ));
}
