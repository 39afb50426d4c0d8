mod equipment;
mod identity;
mod ids;
mod lab;
mod mineral;
mod record;
mod safety;

pub use equipment::Equipment;
pub use identity::{IdentityError, StudentIdentity};
pub use ids::{AvatarId, IdError, SampleId};
pub use lab::{
    DENSITY_TOLERANCE, LabDataError, LabMeasurements, Measurement, MeasurementRequests,
};
pub use mineral::{Mineral, SAMPLE_MINERAL};
pub use record::{ProgressRecord, RecordDraft, RecordError, SAMPLE_MATERIAL, SampleLabel};
pub use safety::{Ppe, SafetyCheck};
