use crate::{Connection, Driver, Result};
use indoc::indoc;

impl<D: Driver> Connection<D> {
    /// Whether a table named `name` exists.
    pub fn is_table(&mut self, name: &str) -> Result<bool> {
        let result = self.count_tables(name);
        self.clear();
        result
    }

    fn count_tables(&mut self, name: &str) -> Result<bool> {
        self.prepare(indoc! {"
            select count(*)
            from sqlite_master
            where name = ? and type = 'table'
        "})?;
        self.bind_text(name)?;
        let count = self.register_int32()?;
        Ok(self.step()?.is_row() && self.slot(&count)?.value() > 0)
    }

    /// Query a pragma, or set it when `value` is given, returning the first column of the first row.
    ///
    /// Pragmas answering with no row yield an empty string.
    pub fn pragma(&mut self, name: &str, value: Option<&str>) -> Result<String> {
        let result = self.query_pragma(name, value);
        self.clear();
        result
    }

    fn query_pragma(&mut self, name: &str, value: Option<&str>) -> Result<String> {
        let sql = match value {
            Some(value) => format!("pragma {} = {}", name, value),
            None => format!("pragma {}", name),
        };
        self.prepare(&sql)?;
        let result = self.register_string()?;
        if !self.step()?.is_row() {
            return Ok(String::new());
        }
        Ok(self.slot(&result)?.to_string_lossy().into_owned())
    }

    pub fn journal_mode(&mut self, mode: Option<&str>) -> Result<String> {
        self.pragma("journal_mode", mode)
    }

    pub fn locking_mode(&mut self, mode: Option<&str>) -> Result<String> {
        self.pragma("locking_mode", mode)
    }

    pub fn vacuum(&mut self) -> Result<()> {
        self.execute("vacuum")
    }

    /// True when `pragma integrity_check` reports `ok`.
    pub fn integrity_check(&mut self) -> Result<bool> {
        self.check("integrity_check")
    }

    /// True when `pragma quick_check` reports `ok`.
    pub fn quick_check(&mut self) -> Result<bool> {
        self.check("quick_check")
    }

    fn check(&mut self, pragma: &str) -> Result<bool> {
        let result = self.run_check(pragma);
        self.clear();
        result
    }

    fn run_check(&mut self, pragma: &str) -> Result<bool> {
        self.prepare(&format!("pragma {}", pragma))?;
        let report = self.register_text(40)?;
        if !self.step()?.is_row() {
            return Ok(false);
        }
        Ok(self
            .slot(&report)?
            .to_string_lossy()
            .eq_ignore_ascii_case("ok"))
    }
}
