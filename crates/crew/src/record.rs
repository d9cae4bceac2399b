/// Implement `crewjobs_engine::Record` for a struct with an `id: Option<RecordId>` field.
///
/// The optional closure-like tail builds the natural key from `$r`.
macro_rules! impl_record {
    ($t:ty, $kind:literal) => {
        impl_record!($t, $kind, |_record| None);
    };
    ($t:ty, $kind:literal, |$r:ident| $key:expr) => {
        impl crewjobs_engine::Record for $t {
            const KIND: &'static str = $kind;

            fn id(&self) -> Option<crewjobs_core::RecordId> {
                self.id
            }

            fn assign_id(&mut self, id: crewjobs_core::RecordId) {
                self.id = Some(id);
            }

            fn natural_key(&self) -> Option<String> {
                let $r = self;
                $key
            }
        }
    };
}
