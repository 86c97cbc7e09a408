/*!
 * Document model module.
 *
 * Contains the intermediate representation shared by every pipeline stage
 * and the derived views (kind groups, outline) built from it.
 */

pub mod grouping;
pub mod model;
pub mod outline;

pub use grouping::KindGroups;
pub use model::{
    Alignment, Block, CellParagraph, DocumentMetadata, DocumentModel, Element, ElementKind,
    ModelStage, Run, SourceFormat, Spacing, Table, TableCell, TableRow, TranslationState,
    TranslationStatus, DEFAULT_RUN_VALUE, primary_run,
};
pub use outline::{Outline, OutlineNode};
