/*!
 * Style stage.
 *
 * Re-maps every element's visual attributes from its kind, the selected
 * `StyleProfile` and the target `LanguagePolicy`. Text, kind and position
 * are never touched; tables pass through as-is.
 */

use std::time::Instant;

use async_trait::async_trait;
use log::{debug, info};

use crate::document::{
    Alignment, Block, DocumentModel, Element, ElementKind, KindGroups, ModelStage, Run,
};
use crate::errors::PipelineError;

use super::profile::{DEFAULT_FONT, LanguagePolicy, StyleProfile};
use super::{StageOutput, StageReport, TransformStage, ensure_structure_preserved};

#[derive(Debug, Clone, Default)]
pub struct StyleStage {
    profile: StyleProfile,
    policy: LanguagePolicy,
}

impl StyleStage {
    pub fn new(profile: StyleProfile, policy: LanguagePolicy) -> Self {
        Self { profile, policy }
    }

    pub fn profile(&self) -> &StyleProfile {
        &self.profile
    }

    pub fn policy(&self) -> &LanguagePolicy {
        &self.policy
    }

    /// Resolve the paragraph alignment for an element
    fn alignment_for(&self, element: &Element) -> Alignment {
        if element.kind == ElementKind::Title || element.alignment == Alignment::Center {
            return Alignment::Center;
        }

        self.profile
            .style_for(element.kind)
            .alignment
            .unwrap_or(if element.kind.is_heading() {
                self.policy.header_alignment
            } else {
                self.policy.default_alignment
            })
    }

    /// Language font first, then the profile's families
    fn font(&self) -> &str {
        self.policy
            .preferred_fonts
            .first()
            .or_else(|| self.profile.font_families.first())
            .map(String::as_str)
            .unwrap_or(DEFAULT_FONT)
    }

    /// Apply profile and policy to a single element
    pub fn style_element(&self, element: &Element) -> Element {
        let style = self.profile.style_for(element.kind);
        let heading = element.kind.is_heading();
        let font = self.font();

        let restyle = |run: &Run| Run {
            text: run.text.clone(),
            bold: heading || run.bold,
            italic: run.italic,
            underline: run.underline,
            font_name: font.to_string(),
            font_size: style.font_size.clone(),
            font_color: style.color.clone(),
        };

        let runs = if element.runs.is_empty() {
            vec![restyle(&Run::new(element.text.clone()))]
        } else {
            element.runs.iter().map(restyle).collect()
        };

        Element {
            runs,
            alignment: self.alignment_for(element),
            spacing: style
                .spacing
                .scaled(self.policy.paragraph_spacing)
                .with_line_multiple(self.policy.line_spacing),
            ..element.clone()
        }
    }
}

#[async_trait]
impl TransformStage for StyleStage {
    fn stage(&self) -> ModelStage {
        ModelStage::Styled
    }

    async fn transform(&self, model: &DocumentModel) -> Result<StageOutput, PipelineError> {
        let started = Instant::now();
        let groups = KindGroups::from_model(model);
        let mut blocks = model.blocks.clone();
        let mut report = StageReport::new(ModelStage::Styled);

        for (kind, indices) in groups.iter() {
            if kind == ElementKind::Table {
                report.skipped += indices.len();
                continue;
            }

            debug!("Styling {} {} elements", indices.len(), kind);
            for &index in indices {
                if let Block::Element(element) = &model.blocks[index] {
                    blocks[index] = Block::Element(self.style_element(element));
                    report.processed += 1;
                }
            }
        }

        let output = DocumentModel::new(model.metadata_for(ModelStage::Styled), blocks);
        ensure_structure_preserved(model, &output)?;

        let report = report.with_duration(started.elapsed());
        info!(
            "Styled {} with profile '{}' for {}: {}",
            model.metadata.source_file,
            self.profile.name,
            self.policy.language,
            report.summary()
        );

        Ok(StageOutput { model: output, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentMetadata, SourceFormat, Spacing, Table, TableRow};

    fn report_model() -> DocumentModel {
        let blocks = vec![
            Block::from(
                Element::new(ElementKind::Title, "[XX] Report")
                    .with_position(0)
                    .with_runs(vec![Run::new("[XX] Report")]),
            ),
            Block::from(
                Element::new(ElementKind::MainHeader, "[XX] Summary")
                    .with_position(1)
                    .with_runs(vec![Run::new("[XX] Summary")]),
            ),
            Block::from(
                Element::new(ElementKind::BodyText, "[XX] All good.")
                    .with_position(2)
                    .with_runs(vec![Run::new("[XX] All good.")]),
            ),
        ];
        DocumentModel::new(DocumentMetadata::new("report.docx", SourceFormat::Docx), blocks)
    }

    fn element(model: &DocumentModel, position: usize) -> &Element {
        model.block_at(position).and_then(Block::as_element).unwrap()
    }

    #[tokio::test]
    async fn test_transform_reportScenario_shouldAlignAndBold() {
        let stage = StyleStage::default();
        let output = stage.transform(&report_model()).await.unwrap().model;

        let title = element(&output, 0);
        assert_eq!(title.alignment, Alignment::Center);
        assert!(title.runs[0].bold);

        let header = element(&output, 1);
        assert_eq!(header.alignment, Alignment::Left);
        assert!(header.runs[0].bold);

        let body = element(&output, 2);
        assert_eq!(body.alignment, Alignment::Justify);
        assert!(!body.runs[0].bold);
        assert_eq!(body.runs[0].font_name, "Arial");
        assert_eq!(body.runs[0].font_size, "11pt");
        assert_eq!(body.spacing, Spacing::new(0.0, 6.0));
        assert_eq!(output.metadata.stage, ModelStage::Styled);
    }

    #[tokio::test]
    async fn test_transform_twice_shouldEqualOnce() {
        let stage = StyleStage::new(StyleProfile::professional(), LanguagePolicy::for_language("japanese"));
        let once = stage.transform(&report_model()).await.unwrap().model;
        let twice = stage.transform(&once).await.unwrap().model;
        assert_eq!(once.blocks, twice.blocks);
    }

    #[test]
    fn test_styleElement_centeredBody_shouldStayCentered() {
        let body = Element::new(ElementKind::BodyText, "centered")
            .with_position(0)
            .with_alignment(Alignment::Center);
        let styled = StyleStage::default().style_element(&body);
        assert_eq!(styled.alignment, Alignment::Center);
    }

    #[test]
    fn test_styleElement_noRuns_shouldCreateDefaultRun() {
        let quote = Element::new(ElementKind::Quote, "To be").with_position(4);
        let styled = StyleStage::default().style_element(&quote);
        assert_eq!(styled.runs.len(), 1);
        assert_eq!(styled.runs[0].text, "To be");
        assert_eq!(styled.runs[0].font_color, "#000000");
        assert_eq!(styled.text, "To be");
    }

    #[test]
    fn test_styleElement_unlistedHeaderKindFallsBackToPolicy() {
        let stage = StyleStage::new(StyleProfile::minimal(), LanguagePolicy::for_language("arabic"));
        let header = Element::new(ElementKind::SubHeader, "عنوان").with_position(0);
        let body = Element::new(ElementKind::BodyText, "نص").with_position(1);

        assert_eq!(stage.style_element(&header).alignment, Alignment::Right);
        assert_eq!(stage.style_element(&body).alignment, Alignment::Right);
    }

    #[test]
    fn test_styleElement_shouldPreserveItalicAndUnderline() {
        let body = Element::new(ElementKind::BodyText, "x")
            .with_position(0)
            .with_runs(vec![Run::new("x").italic(true).underline(true).bold(true)]);
        let run = &StyleStage::default().style_element(&body).runs[0];
        assert!(run.italic && run.underline && run.bold);
    }

    #[test]
    fn test_styleElement_cjkPolicy_shouldCarryLineSpacing() {
        let body = Element::new(ElementKind::BodyText, "本文").with_position(0);

        let japanese = StyleStage::new(StyleProfile::professional(), LanguagePolicy::for_language("japanese"));
        assert_eq!(japanese.style_element(&body).spacing.line_multiple, Some(1.15));

        let spanish = StyleStage::new(StyleProfile::professional(), LanguagePolicy::for_language("spanish"));
        assert_eq!(spanish.style_element(&body).spacing.line_multiple, None);
    }

    #[test]
    fn test_styleElement_policyWithoutFonts_shouldUseProfileFamily() {
        let mut policy = LanguagePolicy::for_language("english");
        policy.preferred_fonts.clear();
        let stage = StyleStage::new(StyleProfile::minimal(), policy);

        let body = Element::new(ElementKind::BodyText, "x").with_position(0);
        assert_eq!(stage.style_element(&body).runs[0].font_name, "Calibri");
    }

    #[tokio::test]
    async fn test_transform_tables_shouldPassThrough() {
        let table = Table::new(vec![TableRow::from_texts(&["a", "b"])]).with_position(1);
        let blocks = vec![
            Block::from(Element::new(ElementKind::BodyText, "before").with_position(0)),
            Block::from(table.clone()),
        ];
        let model = DocumentModel::new(DocumentMetadata::new("t.docx", SourceFormat::Docx), blocks);
        let output = StyleStage::default().transform(&model).await.unwrap();

        assert_eq!(output.model.blocks[1], Block::Table(table));
        assert_eq!(output.report.skipped, 1);
        assert_eq!(output.model.positions(), model.positions());
    }
}
