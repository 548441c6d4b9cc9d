use super::domain::{Application, ApplicationId};

/// Ordered working set of application records plus the id sequence.
///
/// The store answers lookups and applies raw mutations; business rules live in
/// [`ApplicationLifecycle`](super::lifecycle::ApplicationLifecycle), which owns
/// the only handle and serializes access behind a mutex.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationStore {
    records: Vec<Application>,
    next_id: u64,
}

impl Default for ApplicationStore {
    fn default() -> Self {
        Self::from_records(Vec::new())
    }
}

impl ApplicationStore {
    /// Records are never deleted, so the highest stored id marks the sequence position.
    pub fn from_records(records: Vec<Application>) -> Self {
        let next_id = records.iter().map(|record| record.id.0).max().unwrap_or(0) + 1;
        Self { records, next_id }
    }

    pub fn records(&self) -> &[Application] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: ApplicationId) -> Option<&Application> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Lookup keyed on both id and applicant so non-owners cannot tell a record exists.
    pub fn find_owned(&self, id: ApplicationId, user_id: &str) -> Option<&Application> {
        self.records
            .iter()
            .find(|record| record.id == id && record.user_id == user_id)
    }

    pub fn active_for(&self, room_id: u64, user_id: &str) -> Option<&Application> {
        self.records
            .iter()
            .find(|record| record.room_id == room_id && record.user_id == user_id && record.is_active())
    }

    pub fn for_user<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a Application> + 'a {
        self.records
            .iter()
            .filter(move |record| record.user_id == user_id)
    }

    pub fn peek_next_id(&self) -> ApplicationId {
        ApplicationId(self.next_id)
    }

    pub fn allocate_id(&mut self) -> ApplicationId {
        let id = ApplicationId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn append(&mut self, record: Application) {
        self.records.push(record);
    }

    /// Replaces the stored record with the same id, returning the previous version.
    pub fn replace(&mut self, record: Application) -> Option<Application> {
        let slot = self.records.iter_mut().find(|stored| stored.id == record.id)?;
        Some(std::mem::replace(slot, record))
    }

    /// Undoes an [`append`](Self::append) whose commit failed. The id is handed
    /// back only if nothing was allocated after it.
    pub fn discard_last(&mut self, id: ApplicationId) -> Option<Application> {
        if self.records.last().map(|record| record.id) != Some(id) {
            return None;
        }
        let removed = self.records.pop();
        if id.0 + 1 == self.next_id {
            self.next_id = id.0;
        }
        removed
    }
}
