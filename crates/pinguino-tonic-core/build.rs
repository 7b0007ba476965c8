/// Generates the gRPC client and server bindings for `proto/pinguino.proto`.
///
/// Both services (`Coordinator` and `Worker`) and their messages are emitted
/// into `OUT_DIR`, together with an encoded file descriptor set used by the
/// server's reflection service.
///
/// `MoveCommand.payload` is generated as `Bytes` rather than `Vec<u8>` so a
/// payload can be handed to the domain crate's `MoveCommand` without copying.
///
/// # Panics
///
/// Panics if code generation fails.
///
/// # Output
///
/// ```rust,ignore
/// pub mod proto {
///     tonic::include_proto!("pinguino");
/// }
/// ```
use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("pinguino_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();

    config
        .bytes([".pinguino.MoveCommand.payload"])
        .file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/pinguino.proto"], &["proto"])
        .unwrap();
}
