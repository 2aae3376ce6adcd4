use crate::domain::money::Credits;
use crate::domain::user::User;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct UserRow<'a> {
    user: u64,
    name: &'a str,
    balance: Credits,
    category: Option<u64>,
}

/// Writes the final state of users as `user,name,balance,category`.
pub struct UserWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> UserWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(sink),
        }
    }

    pub fn write_users(&mut self, users: impl IntoIterator<Item = User>) -> Result<()> {
        // written by hand so an empty ledger still gets a header
        self.writer
            .write_record(["user", "name", "balance", "category"])?;
        for user in users {
            self.writer.serialize(UserRow {
                user: user.id,
                name: &user.name,
                balance: user.balance,
                category: user.category_id,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_users() {
        let mut buf = Vec::new();
        {
            let mut writer = UserWriter::new(&mut buf);
            let mut alice = User::new(1, "Alice").with_balance(Credits::new(40));
            alice.category_id = Some(10);
            let bob = User::new(2, "Bob");
            writer.write_users(vec![alice, bob]).unwrap();
        }
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out, "user,name,balance,category\n1,Alice,40,10\n2,Bob,0,\n");
    }

    #[test]
    fn test_write_no_users() {
        let mut buf = Vec::new();
        UserWriter::new(&mut buf).write_users(Vec::new()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "user,name,balance,category\n");
    }
}
