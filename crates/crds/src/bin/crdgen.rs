//! Prints the CustomResourceDefinition manifests as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/loganalysisrequests.yaml`

use crds::LogAnalysisRequest;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crd = serde_yaml::to_string(&LogAnalysisRequest::crd())?;
    print!("{crd}");
    Ok(())
}
