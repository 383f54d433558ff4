use anyhow::Result;

use govfeed_core::SourceCatalog;

pub fn run(catalog: &SourceCatalog) -> Result<()> {
    if catalog.is_empty() {
        println!("No sources configured.");
        return Ok(());
    }

    println!("Sources ({}):\n", catalog.len());

    for source in catalog.sources() {
        let hint = source
            .category()
            .map(|c| format!(" [{}]", c))
            .unwrap_or_default();

        println!("  {} ({}){}", source.name(), source.kind().as_str(), hint);
        println!("    URL: {}", source.url());
    }

    if !catalog.domain_categories().is_empty() {
        println!("\nDomain categories:");
        for row in catalog.domain_categories() {
            println!("  {} -> {}", row.domain, row.category);
        }
    }

    Ok(())
}
