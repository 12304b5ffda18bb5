//! Exchange-format exports.

use crate::dispatch::{ParamKind, ParamSchema, RegistryBuilder, RegistryError};
use crate::handlers::shared;
use crate::kernel::ExportFormat;

const EXPORTS: [(&str, ExportFormat); 5] = [
    ("export_step", ExportFormat::Step),
    ("export_iges", ExportFormat::Iges),
    ("export_brep", ExportFormat::Brep),
    ("export_stl", ExportFormat::Stl),
    ("export_obj", ExportFormat::Obj),
];

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    for (method, format) in EXPORTS {
        builder.register(
            method,
            ParamSchema::new()
                .required("filepath", ParamKind::String)
                .optional("objects", ParamKind::StringList),
            move |session, params| shared::export(session, params, format),
        )?;
    }
    Ok(())
}
