//! The built-in CSS 3.0 schema catalog.
//!
//! Column layouts follow the classic write-format strings (`%-6.6s %-8.8s %17.5f ...`);
//! fields are separated by single spaces and every line ends in one newline. `lddate` is
//! always a 19-wide load date. Station, channel, network and datatype columns intern
//! through the quark pool.
use std::sync::Arc;

use crate::schema::{CssColumn, CssSchema, CssType};
use crate::LDDATE_WIDTH;

/// Builds a schema, accounting for field positions as columns are appended.
pub struct SchemaBuilder {
    name: String,
    cols: Vec<CssColumn>,
    extra: Vec<CssColumn>,
    pos: usize,
    id: Option<usize>,
}

impl SchemaBuilder {
    pub fn new(name: &str) -> SchemaBuilder {
        SchemaBuilder {
            name: name.to_string(),
            cols: Vec::new(),
            extra: Vec::new(),
            pos: 0,
            id: None,
        }
    }

    fn col(
        mut self,
        name: &str,
        width: usize,
        prec: Option<usize>,
        left_just: bool,
        ctype: CssType,
        null: &str,
    ) -> Self {
        let start = self.pos;
        self.cols.push(CssColumn {
            name: name.to_string(),
            start,
            end: start + width,
            prec,
            left_just,
            ctype,
            null_value: null.to_string(),
        });
        self.pos = start + width + 1;
        self
    }

    /// A space-padded string column with the `-` null literal.
    pub fn str(self, name: &str, width: usize) -> Self {
        self.col(name, width, None, true, CssType::String, "-")
    }

    /// A string column interned through the quark pool.
    pub fn quark(self, name: &str, width: usize) -> Self {
        self.col(name, width, None, true, CssType::QuarkInterned, "-")
    }

    /// A right-justified long column, null `-1`.
    pub fn long(self, name: &str, width: usize) -> Self {
        self.col(name, width, None, false, CssType::Long, "-1")
    }

    pub fn long_null(self, name: &str, width: usize, null: &str) -> Self {
        self.col(name, width, None, false, CssType::Long, null)
    }

    pub fn int(self, name: &str, width: usize) -> Self {
        self.col(name, width, None, false, CssType::Int, "-1")
    }

    pub fn double(self, name: &str, width: usize, prec: usize, null: &str) -> Self {
        self.col(name, width, Some(prec), false, CssType::Double, null)
    }

    pub fn float(self, name: &str, width: usize, prec: usize, null: &str) -> Self {
        self.col(name, width, Some(prec), false, CssType::Float, null)
    }

    /// An epoch-time column, `%17.5f`, null `-9999999999.999`.
    pub fn time(self, name: &str) -> Self {
        self.col(name, 17, Some(5), false, CssType::Time, "-9999999999.999")
    }

    /// An epoch-time column with a non-standard width (the wfdisc 2.8 dialect).
    pub fn time_wp(self, name: &str, width: usize, prec: usize, null: &str) -> Self {
        self.col(name, width, Some(prec), false, CssType::Time, null)
    }

    /// A julian-date column, `YYYYDDD`, null `-1`.
    pub fn jdate(self, name: &str) -> Self {
        self.col(name, 8, None, false, CssType::JulianDate, "-1")
    }

    /// A calendar-date column, `YYYYMMDD`, null `-1`.
    pub fn date(self, name: &str) -> Self {
        self.col(name, 8, None, false, CssType::Date, "-1")
    }

    /// A single-character boolean column (`y`/`n`), null `-`.
    pub fn boolean(self, name: &str) -> Self {
        self.col(name, 1, None, true, CssType::Bool, "-")
    }

    /// The trailing load-date column every table carries.
    pub fn lddate(self) -> Self {
        self.col("lddate", LDDATE_WIDTH, None, true, CssType::LoadDate, "-")
    }

    /// Mark the most recently appended column as the table's primary key.
    pub fn id(mut self) -> Self {
        self.id = Some(self.cols.len() - 1);
        self
    }

    /// Append an in-memory-only column after the serialized ones.
    pub fn extra(mut self, name: &str, ctype: CssType, null: &str) -> Self {
        self.extra.push(CssColumn {
            name: name.to_string(),
            start: 0,
            end: 0,
            prec: None,
            left_just: true,
            ctype,
            null_value: null.to_string(),
        });
        self
    }

    pub fn build(self) -> Arc<CssSchema> {
        CssSchema::new(&self.name, self.cols, self.extra, self.id)
    }
}

fn wfdisc() -> Arc<CssSchema> {
    SchemaBuilder::new("wfdisc")
        .quark("sta", 6)
        .quark("chan", 8)
        .time("time")
        .long("wfid", 8)
        .id()
        .long("chanid", 8)
        .jdate("jdate")
        .time("endtime")
        .long("nsamp", 8)
        .double("samprate", 11, 7, "-1")
        .double("calib", 16, 6, "0")
        .double("calper", 16, 6, "-1")
        .str("instype", 6)
        .str("segtype", 1)
        .quark("datatype", 2)
        .str("clip", 1)
        .str("dir", 64)
        .str("dfile", 32)
        .long_null("foff", 10, "0")
        .long("commid", 8)
        .lddate()
        .build()
}

/// The elder 2.8 wfdisc dialect; registered alongside 3.0 but never sniffed.
fn wfdisc28() -> Arc<CssSchema> {
    SchemaBuilder::new("wfdisc28")
        .jdate("date")
        .time_wp("time", 15, 3, "-9999999999.999")
        .quark("sta", 6)
        .quark("chan", 2)
        .long("nsamp", 8)
        .double("smprat", 11, 7, "-1")
        .double("calib", 9, 6, "0")
        .double("calper", 7, 4, "-1")
        .str("instyp", 6)
        .str("segtyp", 1)
        .quark("dattyp", 2)
        .str("clip", 1)
        .long("chid", 8)
        .long("wfid", 8)
        .id()
        .str("dir", 30)
        .str("file", 20)
        .long_null("foff", 10, "0")
        .long("adate", 8)
        .str("remark", 30)
        .build()
}

fn arrival() -> Arc<CssSchema> {
    SchemaBuilder::new("arrival")
        .quark("sta", 6)
        .time("time")
        .long("arid", 8)
        .id()
        .jdate("jdate")
        .long("stassid", 8)
        .long("chanid", 8)
        .quark("chan", 8)
        .str("iphase", 8)
        .str("stype", 1)
        .float("deltim", 6, 3, "-1")
        .float("azimuth", 7, 2, "-1")
        .float("delaz", 7, 2, "-1")
        .float("slow", 7, 2, "-1")
        .float("delslo", 7, 2, "-1")
        .float("ema", 7, 2, "-1")
        .float("rect", 7, 3, "-1")
        .float("amp", 10, 1, "-1")
        .float("per", 7, 2, "-1")
        .float("logat", 7, 2, "-1")
        .str("clip", 1)
        .str("fm", 2)
        .float("snr", 10, 2, "-1")
        .str("qual", 1)
        .str("auth", 15)
        .long("commid", 8)
        .lddate()
        .build()
}

fn origin() -> Arc<CssSchema> {
    SchemaBuilder::new("origin")
        .double("lat", 9, 4, "-999")
        .double("lon", 9, 4, "-999")
        .double("depth", 9, 4, "-999")
        .time("time")
        .long("orid", 8)
        .id()
        .long("evid", 8)
        .jdate("jdate")
        .int("nass", 4)
        .int("ndef", 4)
        .int("ndp", 4)
        .long("grn", 8)
        .long("srn", 8)
        .str("etype", 7)
        .double("depdp", 9, 4, "-999")
        .str("dtype", 1)
        .double("mb", 7, 2, "-999")
        .long("mbid", 8)
        .double("ms", 7, 2, "-999")
        .long("msid", 8)
        .double("ml", 7, 2, "-999")
        .long("mlid", 8)
        .str("algorithm", 15)
        .str("auth", 15)
        .long("commid", 8)
        .lddate()
        .build()
}

fn origerr() -> Arc<CssSchema> {
    let mut b = SchemaBuilder::new("origerr").long("orid", 8).id();
    for name in &[
        "sxx", "syy", "szz", "stt", "sxy", "sxz", "syz", "stx", "sty", "stz",
    ] {
        b = b.double(*name, 15, 4, "-1");
    }
    b.double("sdobs", 9, 4, "-1")
        .double("smajax", 9, 4, "-1")
        .double("sminax", 9, 4, "-1")
        .double("strike", 6, 2, "-1")
        .double("sdepth", 9, 4, "-1")
        .double("stime", 8, 2, "-1")
        .double("conf", 5, 3, "0")
        .long("commid", 8)
        .lddate()
        .build()
}

fn assoc() -> Arc<CssSchema> {
    SchemaBuilder::new("assoc")
        .long("arid", 8)
        .long("orid", 8)
        .quark("sta", 6)
        .str("phase", 8)
        .float("belief", 4, 1, "-1")
        .float("delta", 8, 3, "-1")
        .float("seaz", 7, 2, "-999")
        .float("esaz", 7, 2, "-999")
        .float("timeres", 8, 3, "-999")
        .str("timedef", 1)
        .float("azres", 7, 1, "-999")
        .str("azdef", 1)
        .float("slores", 7, 2, "-999")
        .str("slodef", 1)
        .float("emares", 7, 1, "-999")
        .float("wgt", 6, 3, "-1")
        .str("vmodel", 15)
        .long("commid", 8)
        .lddate()
        .build()
}

fn lastid() -> Arc<CssSchema> {
    SchemaBuilder::new("lastid")
        .str("keyname", 15)
        .long("keyvalue", 8)
        .lddate()
        .build()
}

fn sensor() -> Arc<CssSchema> {
    SchemaBuilder::new("sensor")
        .quark("sta", 6)
        .quark("chan", 8)
        .time("time")
        .time("endtime")
        .long("inid", 8)
        .long("chanid", 8)
        .id()
        .jdate("jdate")
        .double("calratio", 16, 6, "-1")
        .double("calper", 16, 6, "-1")
        .double("tshift", 6, 2, "0")
        .str("instant", 1)
        .lddate()
        .build()
}

fn instrument() -> Arc<CssSchema> {
    SchemaBuilder::new("instrument")
        .long("inid", 8)
        .id()
        .str("insname", 50)
        .str("instype", 6)
        .str("band", 1)
        .str("digital", 1)
        .double("samprate", 11, 7, "-1")
        .double("ncalib", 16, 6, "0")
        .double("ncalper", 16, 6, "-1")
        .str("dir", 64)
        .str("dfile", 32)
        .str("rsptype", 6)
        .lddate()
        .build()
}

fn sitechan() -> Arc<CssSchema> {
    SchemaBuilder::new("sitechan")
        .quark("sta", 6)
        .quark("chan", 8)
        .jdate("ondate")
        .long("chanid", 8)
        .id()
        .jdate("offdate")
        .str("ctype", 4)
        .double("edepth", 9, 4, "-1")
        .double("hang", 6, 1, "-1")
        .double("vang", 6, 1, "-1")
        .str("descrip", 50)
        .lddate()
        .build()
}

fn site() -> Arc<CssSchema> {
    SchemaBuilder::new("site")
        .quark("sta", 6)
        .jdate("ondate")
        .jdate("offdate")
        .double("lat", 9, 4, "-999")
        .double("lon", 9, 4, "-999")
        .double("elev", 9, 4, "-999")
        .str("staname", 50)
        .str("statype", 4)
        .quark("refsta", 6)
        .double("dnorth", 9, 4, "0")
        .double("deast", 9, 4, "0")
        .lddate()
        .build()
}

fn affiliation() -> Arc<CssSchema> {
    SchemaBuilder::new("affiliation")
        .quark("net", 8)
        .quark("sta", 6)
        .lddate()
        .build()
}

fn stassoc() -> Arc<CssSchema> {
    SchemaBuilder::new("stassoc")
        .long("stassid", 8)
        .id()
        .quark("sta", 6)
        .str("etype", 7)
        .str("location", 32)
        .float("dist", 7, 2, "-1")
        .float("azimuth", 7, 2, "-1")
        .float("lat", 9, 4, "-999")
        .float("lon", 9, 4, "-999")
        .float("depth", 9, 4, "-999")
        .time("time")
        .float("imb", 7, 2, "-999")
        .float("ims", 7, 2, "-999")
        .float("iml", 7, 2, "-999")
        .str("auth", 15)
        .long("commid", 8)
        .lddate()
        .build()
}

fn wftag() -> Arc<CssSchema> {
    SchemaBuilder::new("wftag")
        .str("tagname", 8)
        .long("tagid", 8)
        .long("wfid", 8)
        .lddate()
        .build()
}

fn netmag() -> Arc<CssSchema> {
    SchemaBuilder::new("netmag")
        .long("magid", 8)
        .id()
        .quark("net", 8)
        .long("orid", 8)
        .long("evid", 8)
        .str("magtype", 6)
        .long("nsta", 8)
        .double("magnitude", 7, 2, "-999")
        .double("uncertainty", 7, 2, "-1")
        .str("auth", 15)
        .long("commid", 8)
        .lddate()
        .build()
}

fn stamag() -> Arc<CssSchema> {
    SchemaBuilder::new("stamag")
        .long("magid", 8)
        .id()
        .long("ampid", 8)
        .quark("sta", 6)
        .long("arid", 8)
        .long("orid", 8)
        .long("evid", 8)
        .str("phase", 8)
        .double("delta", 8, 3, "-1")
        .str("magtype", 6)
        .double("magnitude", 7, 2, "-999")
        .double("uncertainty", 7, 2, "-1")
        .double("magres", 7, 2, "-999")
        .str("magdef", 1)
        .str("mmodel", 15)
        .str("auth", 15)
        .long("commid", 8)
        .lddate()
        .build()
}

fn ampdescript() -> Arc<CssSchema> {
    SchemaBuilder::new("ampdescript")
        .str("amptype", 8)
        .double("toff", 8, 3, "-999")
        .double("tlen", 8, 3, "-1")
        .double("gvlo", 8, 3, "-999")
        .double("gvhi", 8, 3, "-999")
        .str("mtype", 8)
        .str("descr", 250)
        .lddate()
        .build()
}

fn amplitude() -> Arc<CssSchema> {
    SchemaBuilder::new("amplitude")
        .long("ampid", 8)
        .id()
        .long("arid", 8)
        .long("parid", 8)
        .quark("chan", 8)
        .double("amp", 10, 2, "-1")
        .double("per", 7, 2, "-1")
        .double("snr", 10, 2, "-1")
        .time("amptime")
        .time("start_time")
        .double("duration", 7, 2, "-1")
        .double("bandw", 7, 2, "-1")
        .str("amptype", 8)
        .str("units", 15)
        .str("clip", 1)
        .str("inarrival", 1)
        .str("auth", 15)
        .lddate()
        .build()
}

fn filter() -> Arc<CssSchema> {
    SchemaBuilder::new("filter")
        .quark("sta", 6)
        .quark("chan", 8)
        .long("chanid", 8)
        .long("arid", 8)
        .long("wfid", 8)
        .str("band", 2)
        .str("ftype", 1)
        .int("forder", 4)
        .double("lofreq", 9, 4, "-1")
        .double("hifreq", 9, 4, "-1")
        .str("algo", 30)
        .str("program", 15)
        .lddate()
        .build()
}

fn pick() -> Arc<CssSchema> {
    SchemaBuilder::new("pick")
        .quark("sta", 6)
        .quark("chan", 8)
        .long("chanid", 8)
        .time("time")
        .long("arid", 8)
        .str("amptype", 3)
        .float("amp", 10, 2, "-1")
        .float("per", 10, 2, "-1")
        .float("calib", 10, 6, "0")
        .float("calper", 10, 2, "-1")
        .float("ampcalib", 10, 6, "0")
        .float("ampmin", 10, 2, "-1")
        .long("commid", 8)
        .lddate()
        .build()
}

fn parrival() -> Arc<CssSchema> {
    SchemaBuilder::new("parrival")
        .long("parid", 8)
        .id()
        .long("orid", 8)
        .long("evid", 8)
        .quark("sta", 6)
        .time("time")
        .double("azimuth", 7, 2, "-1")
        .double("slow", 7, 2, "-1")
        .str("phase", 8)
        .double("delta", 8, 3, "-1")
        .str("vmodel", 15)
        .lddate()
        .build()
}

fn staconf() -> Arc<CssSchema> {
    SchemaBuilder::new("staconf")
        .quark("sta", 6)
        .jdate("ondate")
        .jdate("offdate")
        .str("statype", 4)
        .quark("refsta", 6)
        .str("auth", 15)
        .lddate()
        .build()
}

fn gregion() -> Arc<CssSchema> {
    SchemaBuilder::new("gregion")
        .long("grn", 8)
        .str("grname", 40)
        .lddate()
        .build()
}

fn outage() -> Arc<CssSchema> {
    SchemaBuilder::new("outage")
        .quark("sta", 6)
        .quark("chan", 8)
        .time("time")
        .time("endtime")
        .str("auth", 15)
        .long("commid", 8)
        .lddate()
        .build()
}

fn fsdisc() -> Arc<CssSchema> {
    SchemaBuilder::new("fsdisc")
        .jdate("jdate")
        .time("time")
        .double("tlen", 6, 2, "-1")
        .quark("sta", 6)
        .quark("chan", 8)
        .str("fstype", 4)
        .long("arid", 8)
        .double("maxf", 9, 4, "-1")
        .long("nf", 8)
        .double("samprate", 9, 4, "-1")
        .long("chanid", 8)
        .long("wfid", 8)
        .long("fsrid", 8)
        .long("fsid", 8)
        .id()
        .quark("datatype", 2)
        .str("dir", 64)
        .str("dfile", 32)
        .long_null("foff", 10, "0")
        .long("commid", 8)
        .lddate()
        .build()
}

fn fsave() -> Arc<CssSchema> {
    SchemaBuilder::new("fsave")
        .long("fsid", 8)
        .id()
        .long("fsrid", 8)
        .quark("sta", 6)
        .quark("chan", 8)
        .time("time")
        .time("endtime")
        .long("winpts", 8)
        .long("overlap", 8)
        .long("nfft", 8)
        .double("smoothvalue", 9, 4, "-1")
        .str("auth", 15)
        .lddate()
        .build()
}

fn fsrecipe() -> Arc<CssSchema> {
    SchemaBuilder::new("fsrecipe")
        .long("fsrid", 8)
        .id()
        .str("fsdesc", 32)
        .str("taper", 8)
        .long("winpts", 8)
        .long("overlap", 8)
        .double("smoothvalue", 9, 4, "-1")
        .lddate()
        .build()
}

fn fstag() -> Arc<CssSchema> {
    SchemaBuilder::new("fstag")
        .long("fsid", 8)
        .long("wfid", 8)
        .lddate()
        .build()
}

fn spdisc() -> Arc<CssSchema> {
    SchemaBuilder::new("spdisc")
        .jdate("jdate")
        .time("time")
        .double("tlen", 6, 2, "-1")
        .quark("sta", 6)
        .quark("chan", 8)
        .str("sptype", 4)
        .long("arid", 8)
        .double("samprate", 9, 4, "-1")
        .long("nsamp", 8)
        .long("chanid", 8)
        .long("wfid", 8)
        .long("spid", 8)
        .id()
        .quark("datatype", 2)
        .str("dir", 64)
        .str("dfile", 32)
        .long_null("foff", 10, "0")
        .long("commid", 8)
        .lddate()
        .build()
}

fn dervdisc() -> Arc<CssSchema> {
    SchemaBuilder::new("dervdisc")
        .long("dervid", 8)
        .id()
        .jdate("jdate")
        .time("time")
        .double("tlen", 6, 2, "-1")
        .quark("sta", 6)
        .quark("chan", 8)
        .str("dervtype", 4)
        .long("arid", 8)
        .str("method", 15)
        .quark("datatype", 2)
        .str("dir", 64)
        .str("dfile", 32)
        .long_null("foff", 10, "0")
        .long("commid", 8)
        .lddate()
        .build()
}

fn pmcc_recipe() -> Arc<CssSchema> {
    SchemaBuilder::new("pmcc_recipe")
        .long("pmccrecid", 8)
        .id()
        .double("winlen", 7, 2, "-1")
        .double("winstep", 7, 2, "-1")
        .double("threshcons", 9, 4, "-1")
        .int("threshnsens", 4)
        .double("qfactor", 7, 2, "-1")
        .double("fmin", 7, 2, "-1")
        .double("fmax", 7, 2, "-1")
        .int("nfband", 4)
        .str("auth", 15)
        .lddate()
        .build()
}

fn pmcc_features() -> Arc<CssSchema> {
    SchemaBuilder::new("pmcc_features")
        .long("pmccrecid", 8)
        .long("arid", 8)
        .time("initial_time")
        .double("duration", 7, 2, "-1")
        .double("consistency", 9, 4, "-1")
        .double("correlation", 7, 2, "-1")
        .long("famsize", 8)
        .double("fmin", 7, 2, "-1")
        .double("fmax", 7, 2, "-1")
        .double("cfreq", 7, 2, "-1")
        .double("sigmafreq", 7, 2, "-1")
        .double("rmsamp", 10, 2, "-1")
        .double("azim", 7, 2, "-1")
        .double("sigmaazim", 7, 2, "-1")
        .double("speed", 7, 2, "-1")
        .double("sigmaspeed", 7, 2, "-1")
        .str("auth", 15)
        .long("commid", 8)
        .lddate()
        .build()
}

fn hydro_features() -> Arc<CssSchema> {
    SchemaBuilder::new("hydro_features")
        .long("arid", 8)
        .time("initial_time")
        .double("duration", 7, 3, "-1")
        .time("peak_time")
        .double("peak_level", 10, 2, "-999")
        .double("total_energy", 12, 2, "-1")
        .time("mean_arrival_time")
        .time("onset_time")
        .time("termination_time")
        .long("num_cross", 8)
        .double("ford", 7, 3, "-1")
        .double("fzc", 7, 3, "-1")
        .double("fcentroid", 7, 3, "-1")
        .str("crosstalk", 2)
        .int("probweight", 4)
        .lddate()
        .build()
}

fn infra_features() -> Arc<CssSchema> {
    SchemaBuilder::new("infra_features")
        .long("arid", 8)
        .time("eng_time")
        .double("eng_dur", 7, 2, "-1")
        .double("eng_deltaf", 7, 2, "-1")
        .double("coh_per", 7, 2, "-1")
        .double("coh_snr", 7, 2, "-1")
        .double("total_energy", 12, 2, "-1")
        .double("crosscorr", 7, 2, "-1")
        .str("auth", 15)
        .long("commid", 8)
        .lddate()
        .build()
}

fn qcdata() -> Arc<CssSchema> {
    SchemaBuilder::new("qcdata")
        .quark("sta", 6)
        .quark("chan", 8)
        .time("time")
        .time("endtime")
        .long("nseg", 8)
        .long("nbad", 8)
        .str("qcdef", 15)
        .str("auth", 15)
        .lddate()
        .build()
}

fn qcmaskdef() -> Arc<CssSchema> {
    SchemaBuilder::new("qcmaskdef")
        .long("qcdefid", 8)
        .id()
        .str("name", 15)
        .str("fix", 1)
        .long("drop_thr", 8)
        .double("spike_thr", 10, 2, "-1")
        .double("single_trace_spike_thr", 10, 2, "-1")
        .long("ntaper", 8)
        .long("niter", 8)
        .long("nsamp", 8)
        .long("nover", 8)
        .str("spike_stat", 8)
        .double("spike_val", 10, 2, "-1")
        .long("spike_npwin", 8)
        .str("spike_dset", 8)
        .lddate()
        .build()
}

fn qcmaskinfo() -> Arc<CssSchema> {
    SchemaBuilder::new("qcmaskinfo")
        .long("qcmaskid", 8)
        .id()
        .long("qcdefid", 8)
        .quark("sta", 6)
        .quark("chan", 8)
        .time("time")
        .time("endtime")
        .long("nseg", 8)
        .lddate()
        .build()
}

fn qcmaskseg() -> Arc<CssSchema> {
    SchemaBuilder::new("qcmaskseg")
        .long("qcmaskid", 8)
        .long("segno", 8)
        .long("startsamp", 10)
        .long("endsamp", 10)
        .lddate()
        .build()
}

pub(crate) fn builtin_schemas() -> Vec<Arc<CssSchema>> {
    vec![
        affiliation(),
        ampdescript(),
        amplitude(),
        arrival(),
        assoc(),
        dervdisc(),
        filter(),
        fsave(),
        fsdisc(),
        fsrecipe(),
        fstag(),
        gregion(),
        hydro_features(),
        infra_features(),
        instrument(),
        lastid(),
        netmag(),
        origerr(),
        origin(),
        outage(),
        parrival(),
        pick(),
        pmcc_features(),
        pmcc_recipe(),
        qcdata(),
        qcmaskdef(),
        qcmaskinfo(),
        qcmaskseg(),
        sensor(),
        site(),
        sitechan(),
        spdisc(),
        staconf(),
        stamag(),
        stassoc(),
        wfdisc(),
        wfdisc28(),
        wftag(),
    ]
}
