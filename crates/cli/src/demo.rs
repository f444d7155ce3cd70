//! The walkthrough: each session operation in turn, with labeled output.

use std::io::Write;

use chrono::NaiveDate;
use tether_core::{Person, Result};
use tether_engine::{Database, EntityRef, Session};

use crate::format::{format_error, OutputMode};

/// Run the walkthrough against `db`, writing progress to `out`
///
/// On error the active transaction (if any) is rolled back; the session is
/// closed on every path.
pub fn run(db: &Database, today: NaiveDate, mode: OutputMode, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Initializing Tether configuration...")?;
    let mut session = db.session();
    let result = steps(&mut session, today, out);

    if let Err(e) = &result {
        writeln!(out, "An error occurred: Rolling back transaction...")?;
        writeln!(out, "{}", format_error(e, mode))?;
        if session.in_transaction() {
            session.rollback()?;
        }
    }

    writeln!(out, "Closing session...")?;
    session.close()?;
    writeln!(out, "Session closed.")?;
    result
}

fn steps(s: &mut Session, today: NaiveDate, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Creating a new Person object...")?;
    let person1 = EntityRef::new(Person::new("John Doe", Some(today)));

    // save: immediate insert, identity returned
    writeln!(out, "Saving Person object using save() method...")?;
    s.begin()?;
    s.save(&person1)?;
    s.commit()?;
    writeln!(out, "Person saved with ID: {}", person1.identity())?;

    // get: None on a miss
    writeln!(out, "Fetching Person using get() method...")?;
    match s.get::<Person>(person1.identity())? {
        Some(p) => writeln!(out, "Fetched person using get(): {}", p.read(|p| p.name().to_string())?)?,
        None => writeln!(out, "No person found with the given ID using get().")?,
    }

    // load: proxy, fails on access if missing
    writeln!(out, "Fetching Person using load() method...")?;
    let loaded = s.load::<Person>(person1.identity());
    match loaded.read(|p| p.name().to_string()) {
        Ok(name) => writeln!(out, "Fetched person using load(): {}", name)?,
        Err(e) => writeln!(out, "Exception occurred while loading person: {}", e)?,
    }

    // persist: insert deferred to commit
    writeln!(out, "Creating another Person object...")?;
    let person2 = EntityRef::new(Person::new("Jane Doe", Some(today)));
    writeln!(out, "Saving Person object using persist() method...")?;
    s.begin()?;
    s.persist(&person2)?;
    s.commit()?;
    writeln!(out, "Person saved with ID: {}", person2.identity())?;

    // update: attached entity, written at commit
    writeln!(out, "Updating Person object using update() method...")?;
    s.begin()?;
    person2.write(|p| p.set_name("Jane Smith"))?;
    s.update(&person2)?;
    s.commit()?;
    writeln!(out, "Person updated: New Name = {}", person2.read(|p| p.name().to_string())?)?;

    // saveOrUpdate: routes on identity
    writeln!(out, "Creating and saving/updating another Person using saveOrUpdate()...")?;
    let person3 = EntityRef::new(Person::new("Michael Johnson", Some(today)));
    s.begin()?;
    s.save_or_update(&person3)?;
    s.commit()?;
    writeln!(out, "Person saved/updated with ID: {}", person3.identity())?;

    // merge: returns the managed instance
    writeln!(out, "Creating and merging a detached Person object...")?;
    let detached = EntityRef::new(Person::new("Emily Davis", Some(today)));
    s.begin()?;
    let merged = s.merge(&detached)?;
    s.commit()?;
    let merged = merged.get()?;
    let dob = merged
        .dob()
        .map_or_else(|| "(nil)".to_string(), |d| d.to_string());
    writeln!(out, "Merged Person details: Name = {}, DOB = {}", merged.name(), dob)?;

    // delete: record removed at commit
    writeln!(out, "Deleting a Person object using delete() method...")?;
    s.begin()?;
    s.delete(&person1)?;
    s.commit()?;
    writeln!(out, "Person with ID {} deleted.", person1.identity())?;

    // evict: session cache only
    writeln!(out, "Evicting a Person object from session cache...")?;
    s.evict(&person2);
    writeln!(out, "Person with ID {} evicted from cache.", person2.identity())?;

    // clear: whole session cache
    writeln!(out, "Clearing the entire session cache...")?;
    s.clear();
    writeln!(out, "Session cache cleared.")?;
    Ok(())
}
