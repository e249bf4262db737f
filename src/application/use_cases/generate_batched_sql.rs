use std::fs;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{
    application::commands::{GenerateBatchedSqlCommand, GenerateBatchedSqlResult},
    domain::row_batch::RowBatchSlicer,
    infrastructure::{
        artifact_layout::ArtifactLayout, csv_source::read_source_table,
        sql_script::BatchScriptRenderer,
    },
};

#[derive(Debug, Default)]
pub struct GenerateBatchedSqlUseCase;

impl GenerateBatchedSqlUseCase {
    pub fn execute(&self, command: GenerateBatchedSqlCommand) -> Result<GenerateBatchedSqlResult> {
        let source_table = read_source_table(&command.source_path, &command.id_column)
            .with_context(|| {
                format!("Unable to load CSV source {}", command.source_path.display())
            })?;

        if source_table.is_empty() {
            warn!(source = %command.source_path.display(), "CSV source has no data rows");
        }

        let row_batch_slicer = RowBatchSlicer::new(source_table.len(), command.batch_size)?;
        let script_renderer = BatchScriptRenderer::new(
            &command.table,
            command.value_mode,
            command.empty_as_null,
        )?;

        // A rejected value must leave the previous output untouched.
        let rendered_batches = row_batch_slicer
            .iter_ranges()
            .map(|range| {
                script_renderer
                    .render(&source_table, &source_table.rows()[range.start..range.end])
                    .map(|scripts| (range, scripts))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let layout = ArtifactLayout::new(&command.output_dir);
        layout.reset()?;

        for (range, scripts) in &rendered_batches {
            let update_path = layout.update_script_path(range.index);
            fs::write(&update_path, &scripts.update)
                .with_context(|| format!("Unable to write {}", update_path.display()))?;

            let selector_path = layout.selector_script_path(range.index);
            fs::write(&selector_path, &scripts.selector)
                .with_context(|| format!("Unable to write {}", selector_path.display()))?;
            debug!(batch = range.index, rows = range.len(), "batch scripts written");
        }

        info!(
            rows = source_table.len(),
            columns = source_table.headers().len(),
            batches = rendered_batches.len(),
            value_mode = command.value_mode.as_str(),
            "generated batched SQL"
        );
        Ok(GenerateBatchedSqlResult {
            output_dir: command.output_dir,
            row_count: source_table.len(),
            batch_count: rendered_batches.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use super::GenerateBatchedSqlUseCase;
    use crate::{
        application::commands::GenerateBatchedSqlCommand,
        infrastructure::{artifact_layout::ArtifactLayout, sql_script::ValueMode},
    };

    fn command(source: &Path, output: &Path, batch_size: usize) -> GenerateBatchedSqlCommand {
        GenerateBatchedSqlCommand {
            source_path: source.to_path_buf(),
            table: "orders".to_string(),
            output_dir: output.to_path_buf(),
            batch_size,
            id_column: "id".to_string(),
            value_mode: ValueMode::Raw,
            empty_as_null: false,
        }
    }

    fn write_csv(dir: &Path, rows: usize) -> std::path::PathBuf {
        let mut content = String::from("id,name,score\n");
        for id in 1..=rows {
            content.push_str(&format!("{id},'user{id}',{}\n", id * 10));
        }
        let path = dir.join("source.csv");
        fs::write(&path, content).expect("csv should be written");
        path
    }

    fn file_count(dir: &Path) -> usize {
        fs::read_dir(dir).expect("dir should be listed").count()
    }

    #[test]
    fn generates_the_documented_orders_example() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let source = temp.path().join("orders.csv");
        fs::write(&source, "id,name,score\n1,Alice,10\n2,Bob,20\n3,Cara,30\n")
            .expect("csv should be written");
        let output = temp.path().join("output");

        let result = GenerateBatchedSqlUseCase
            .execute(command(&source, &output, 2))
            .expect("generation should succeed");

        assert_eq!(result.batch_count, 2);
        assert_eq!(result.row_count, 3);
        let layout = ArtifactLayout::new(&output);
        assert_eq!(
            fs::read_to_string(layout.update_script_path(0)).expect("batch 0 update"),
            "BEGIN;\n\
             UPDATE \"orders\" SET name = Alice, score = 10 WHERE id = 1;\n\
             UPDATE \"orders\" SET name = Bob, score = 20 WHERE id = 2;\n\
             COMMIT;"
        );
        assert_eq!(
            fs::read_to_string(layout.selector_script_path(0)).expect("batch 0 selector"),
            "SELECT * FROM \"orders\" WHERE id = 1 OR id = 2;"
        );
        assert_eq!(
            fs::read_to_string(layout.update_script_path(1)).expect("batch 1 update"),
            "BEGIN;\nUPDATE \"orders\" SET name = Cara, score = 30 WHERE id = 3;\nCOMMIT;"
        );
        assert!(layout.backup_dir().is_dir());
        assert_eq!(file_count(&layout.backup_dir()), 0);
    }

    #[test]
    fn batch_files_match_ceil_of_rows_over_size() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let source = write_csv(temp.path(), 7);
        let output = temp.path().join("output");

        let result = GenerateBatchedSqlUseCase
            .execute(command(&source, &output, 3))
            .expect("generation should succeed");

        let layout = ArtifactLayout::new(&output);
        assert_eq!(result.batch_count, 3);
        assert_eq!(file_count(&layout.backfill_dir()), 3);
        assert_eq!(file_count(&layout.selector_dir()), 3);
        assert_eq!(layout.discover_batch_count().expect("contiguous"), 3);

        for index in 0..3 {
            let update = fs::read_to_string(layout.update_script_path(index)).expect("update");
            let expected_rows = if index == 2 { 1 } else { 3 };
            assert!(update.starts_with("BEGIN;\n"));
            assert!(update.ends_with("\nCOMMIT;"));
            assert_eq!(update.matches("UPDATE \"orders\"").count(), expected_rows);

            let selector =
                fs::read_to_string(layout.selector_script_path(index)).expect("selector");
            let ids = (index * 3 + 1..=(index * 3 + 3).min(7))
                .map(|id| format!("id = {id}"))
                .collect::<Vec<_>>();
            assert_eq!(
                selector,
                format!("SELECT * FROM \"orders\" WHERE {};", ids.join(" OR "))
            );
        }
    }

    #[test]
    fn rerun_is_deterministic_and_drops_stale_batches() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let output = temp.path().join("output");
        let layout = ArtifactLayout::new(&output);

        let larger = write_csv(temp.path(), 10);
        GenerateBatchedSqlUseCase
            .execute(command(&larger, &output, 2))
            .expect("first generation");
        assert_eq!(file_count(&layout.backfill_dir()), 5);
        fs::write(layout.backup_path(4), "id\n9\n").expect("backup written");

        let smaller = write_csv(temp.path(), 3);
        GenerateBatchedSqlUseCase
            .execute(command(&smaller, &output, 2))
            .expect("second generation");
        let first_update = fs::read(layout.update_script_path(0)).expect("update 0");
        let first_selector = fs::read(layout.selector_script_path(1)).expect("selector 1");

        assert_eq!(file_count(&layout.backfill_dir()), 2);
        assert_eq!(file_count(&layout.selector_dir()), 2);
        assert_eq!(file_count(&layout.backup_dir()), 0);

        GenerateBatchedSqlUseCase
            .execute(command(&smaller, &output, 2))
            .expect("third generation");
        assert_eq!(
            fs::read(layout.update_script_path(0)).expect("update 0"),
            first_update
        );
        assert_eq!(
            fs::read(layout.selector_script_path(1)).expect("selector 1"),
            first_selector
        );
    }

    #[test]
    fn invalid_value_keeps_previous_output() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let output = temp.path().join("output");
        let layout = ArtifactLayout::new(&output);
        let good = write_csv(temp.path(), 2);
        GenerateBatchedSqlUseCase
            .execute(command(&good, &output, 1))
            .expect("first generation");

        let bad = temp.path().join("bad.csv");
        fs::write(&bad, "id,name\n1,'a'; DELETE FROM orders\n").expect("csv should be written");
        let error = GenerateBatchedSqlUseCase
            .execute(command(&bad, &output, 1))
            .expect_err("invalid value should fail");

        assert!(error.to_string().contains("not a single SQL expression"));
        assert_eq!(file_count(&layout.backfill_dir()), 2);
    }

    #[test]
    fn missing_id_column_is_a_hard_error() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let source = temp.path().join("no_id.csv");
        fs::write(&source, "name,score\nAlice,10\n").expect("csv should be written");

        let error = GenerateBatchedSqlUseCase
            .execute(command(&source, &temp.path().join("output"), 10))
            .expect_err("missing id column should fail");

        assert!(
            format!("{error:#}").contains("Identifier column `id` is not present")
        );
        assert!(!temp.path().join("output").exists());
    }
}
