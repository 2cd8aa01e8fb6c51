use apimachinery::apis::{archiver::PostgresArchiver, KindRegistry};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let registry = KindRegistry::all();
    let archiver = PostgresArchiver::crd();
    let documents = registry
        .crds()
        .chain(std::iter::once(&archiver))
        .map(serde_yaml::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    print!("{}", documents.join("---\n"));
    Ok(())
}
