use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let proto_root = manifest_dir.join("../../proto");
    let proto = proto_root.join("relbatch/v1/relationship.proto");

    println!("cargo:rerun-if-changed={}", proto.display());

    tonic_build::configure().compile_protos(&[proto], &[proto_root])?;

    Ok(())
}
